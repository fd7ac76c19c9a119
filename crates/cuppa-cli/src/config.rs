use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub storage: Storage,
    pub source: Option<Source>,
    pub tui: Option<Tui>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum Storage {
    LocalSqlite { db_path: Option<PathBuf> },
    Memory,
}

impl Default for Storage {
    fn default() -> Self {
        Storage::LocalSqlite { db_path: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Source {
    /// Upstream base; images come from `<base_url>/random`
    pub base_url: Option<String>,
    pub user_agent: Option<String>,
    /// Per-request timeout. Unset leaves the transport default in charge.
    pub timeout_ms: Option<u64>,
    /// Batch size offered by the gallery's brew prompt (default: 3)
    pub default_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Tui {
    /// Event poll interval in milliseconds (default: 100)
    pub refresh_ms: Option<u64>,
    /// Palette overrides file; defaults to `<config_dir>/tui_theme.toml`
    pub theme_file: Option<String>,
    /// Whether to use the alternate screen (default: true)
    pub alt_screen: Option<bool>,
}

impl Settings {
    pub fn base_url(&self) -> String {
        self.source
            .as_ref()
            .and_then(|s| s.base_url.clone())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| cuppa_core::source::DEFAULT_BASE_URL.to_string())
    }

    pub fn user_agent(&self) -> String {
        self.source
            .as_ref()
            .and_then(|s| s.user_agent.clone())
            .unwrap_or_else(|| cuppa_core::source::DEFAULT_USER_AGENT.to_string())
    }

    pub fn timeout(&self) -> Option<std::time::Duration> {
        self.source
            .as_ref()
            .and_then(|s| s.timeout_ms)
            .map(std::time::Duration::from_millis)
    }

    pub fn default_count(&self) -> usize {
        self.source
            .as_ref()
            .and_then(|s| s.default_count)
            .filter(|n| *n > 0)
            .unwrap_or(3)
    }

    pub fn refresh_ms(&self) -> u64 {
        self.tui.as_ref().and_then(|t| t.refresh_ms).unwrap_or(100)
    }

    pub fn alt_screen(&self) -> bool {
        self.tui.as_ref().and_then(|t| t.alt_screen).unwrap_or(true)
    }

    pub fn theme_file(&self) -> PathBuf {
        self.tui
            .as_ref()
            .and_then(|t| t.theme_file.as_deref())
            .filter(|p| !p.trim().is_empty())
            .map(expand)
            .unwrap_or_else(|| config_dir().join("tui_theme.toml"))
    }

    /// `--db` wins over settings, settings over the default location.
    pub fn db_path(&self, flag: Option<&PathBuf>) -> PathBuf {
        if let Some(p) = flag {
            return p.clone();
        }
        match &self.storage {
            Storage::LocalSqlite { db_path: Some(p) } => expand(&p.to_string_lossy()),
            _ => default_db_path(),
        }
    }
}

fn expand(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

pub fn config_dir() -> PathBuf {
    if let Some(bd) = directories::BaseDirs::new() {
        bd.config_dir().join("cuppa")
    } else {
        PathBuf::from("./.config/cuppa")
    }
}

pub fn state_dir() -> PathBuf {
    // Prefer XDG state dir when available; fall back to config dir
    if let Some(bd) = directories::BaseDirs::new() {
        if let Some(sd) = bd.state_dir() {
            return sd.join("cuppa");
        }
    }
    config_dir()
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.toml")
}

pub fn default_db_path() -> PathBuf {
    config_dir().join("db").join("cuppa.db")
}

pub fn log_path() -> PathBuf {
    state_dir().join("cuppa.log")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    let Ok(s) = std::fs::read_to_string(&path) else {
        return Settings::default();
    };
    toml::from_str(&s).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "settings unreadable, using defaults");
        Settings::default()
    })
}
