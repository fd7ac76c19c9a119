//! cuppa-core: item types, the fetch/filter/sort pipeline, and local preference storage

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub mod collection;
pub mod error;
pub mod gallery;
pub mod kv;
pub mod prefs;
pub mod query;
pub mod source;

pub use collection::Collection;
pub use error::Error;
pub use gallery::{Gallery, ViewItem};
pub use kv::{KvImpl, KvStore, MemKv};
pub use prefs::{Marks, Preferences};
pub use query::SortMode;
pub use source::{parse_count, ItemSource, Probe};

#[cfg(feature = "http")]
pub use source::HttpProbe;

pub type ItemId = String;

/// One fetched image. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub source_url: String,
    pub display_url: String,
    pub filename: String,
    pub added_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => anyhow::bail!("unknown theme {:?} (expected dark or light)", other),
        }
    }
}

fn gen_id() -> ItemId {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_parses_case_insensitively_and_toggles() {
        assert_eq!(" Light ".parse::<Theme>().unwrap(), Theme::Light);
        assert!("sepia".parse::<Theme>().is_err());
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
        assert_eq!(Theme::Dark.toggled().toggled(), Theme::Dark);
        assert_eq!(Theme::default(), Theme::Dark);
    }

    #[test]
    fn generated_ids_differ() {
        assert_ne!(gen_id(), gen_id());
    }
}
