//! String key/value persistence with a typed, fallback-on-corruption layer on top.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;

pub trait KvStore: Send + Sync {
    fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }
    fn get_raw(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set_raw(&self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&self, key: &str) -> anyhow::Result<()>;
}

/// Reads `key` as JSON. Absent, unreadable, or malformed values yield `fallback`.
pub fn load<T: DeserializeOwned>(store: &dyn KvStore, key: &str, fallback: T) -> T {
    match store.get_raw(key) {
        Ok(raw) => decode(key, raw, fallback),
        Err(e) => {
            tracing::warn!(key, error = %e, "kv read failed, using fallback");
            fallback
        }
    }
}

/// Read half of a read-modify-write. A failed backend read is returned as an error so the
/// write never replaces stored data with `fallback`; absent or malformed values still fall back.
pub fn load_for_update<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
    fallback: T,
) -> anyhow::Result<T> {
    let raw = store.get_raw(key)?;
    Ok(decode(key, raw, fallback))
}

fn decode<T: DeserializeOwned>(key: &str, raw: Option<String>, fallback: T) -> T {
    let Some(raw) = raw else {
        return fallback;
    };
    match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(key, error = %e, "stored value is corrupt, using fallback");
            fallback
        }
    }
}

pub fn save<T: Serialize + ?Sized>(store: &dyn KvStore, key: &str, value: &T) -> anyhow::Result<()> {
    let raw = serde_json::to_string(value)?;
    store.set_raw(key, &raw)
}

#[derive(Default)]
pub struct MemKv {
    inner: RwLock<HashMap<String, String>>,
}

impl MemKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemKv {
    fn get_raw(&self, key: &str) -> anyhow::Result<Option<String>> {
        let m = self.inner.read().expect("poisoned");
        Ok(m.get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut m = self.inner.write().expect("poisoned");
        m.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.inner.write().expect("poisoned").remove(key);
        Ok(())
    }
}

#[cfg(feature = "sqlite")]
mod sqlite_kv {
    use super::KvStore;
    use rusqlite::{params, Connection, OptionalExtension};
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    const SCHEMA_VERSION: i64 = 1;

    pub struct SqliteKv {
        path: PathBuf,
        conn: Mutex<Connection>,
    }

    impl SqliteKv {
        pub fn new<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
            let path = path.as_ref().to_path_buf();
            if let Some(dir) = path.parent() {
                if !dir.as_os_str().is_empty() {
                    std::fs::create_dir_all(dir)?;
                }
            }
            let conn = Connection::open(&path)?;
            let _ = conn.pragma_update(None, "journal_mode", "WAL");
            conn.busy_timeout(std::time::Duration::from_millis(5000))?;
            let store = Self {
                path,
                conn: Mutex::new(conn),
            };
            store.migrate()?;
            Ok(store)
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        fn migrate(&self) -> anyhow::Result<()> {
            let conn = self.conn.lock().expect("poisoned");
            let current: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
            if current >= SCHEMA_VERSION {
                return Ok(());
            }
            let tx = conn.unchecked_transaction()?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL
                );",
            )?;
            tx.execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;
            tx.commit()?;
            tracing::debug!(path = %self.path.display(), "kv schema at version {}", SCHEMA_VERSION);
            Ok(())
        }
    }

    impl KvStore for SqliteKv {
        fn get_raw(&self, key: &str) -> anyhow::Result<Option<String>> {
            let conn = self.conn.lock().expect("poisoned");
            let v = conn
                .query_row("SELECT value FROM kv WHERE key = ?", [key], |r| r.get(0))
                .optional()?;
            Ok(v)
        }

        fn set_raw(&self, key: &str, value: &str) -> anyhow::Result<()> {
            let conn = self.conn.lock().expect("poisoned");
            conn.execute(
                "INSERT INTO kv(key, value) VALUES(?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        }

        fn remove(&self, key: &str) -> anyhow::Result<()> {
            let conn = self.conn.lock().expect("poisoned");
            conn.execute("DELETE FROM kv WHERE key = ?", [key])?;
            Ok(())
        }
    }

    pub use SqliteKv as KvImpl;
}

#[cfg(feature = "sqlite")]
pub use sqlite_kv::SqliteKv;

#[cfg(feature = "sqlite")]
pub use sqlite_kv::KvImpl;

#[cfg(not(feature = "sqlite"))]
pub use MemKv as KvImpl;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn load_falls_back_when_absent_or_corrupt() {
        let kv = MemKv::new();
        let empty: BTreeMap<String, bool> = load(&kv, "favs", BTreeMap::new());
        assert!(empty.is_empty());

        kv.set_raw("favs", "{not json").unwrap();
        let still_empty: BTreeMap<String, bool> = load(&kv, "favs", BTreeMap::new());
        assert!(still_empty.is_empty());
    }

    #[test]
    fn save_then_load() {
        let kv = MemKv::new();
        let mut m = BTreeMap::new();
        m.insert("a".to_string(), true);
        save(&kv, "favs", &m).unwrap();
        let back: BTreeMap<String, bool> = load(&kv, "favs", BTreeMap::new());
        assert_eq!(back, m);
        kv.remove("favs").unwrap();
        assert_eq!(kv.get_raw("favs").unwrap(), None);
    }
}
