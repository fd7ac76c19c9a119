//! Favorites, notes and theme, each persisted under its own key.
//!
//! Entries are keyed by item id and are not tied to the in-memory collection: they survive a
//! clear and may point at items that no longer exist.

use crate::kv::{self, KvStore};
use crate::{ItemId, Theme};
use std::collections::{BTreeMap, BTreeSet, HashSet};

pub const FAVORITES_KEY: &str = "cuppa.favorites";
pub const NOTES_KEY: &str = "cuppa.notes";
pub const THEME_KEY: &str = "cuppa.theme";

/// Snapshot of favorites and notes consulted while deriving a view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Marks {
    pub favorites: BTreeSet<ItemId>,
    pub notes: BTreeMap<ItemId, String>,
}

impl Marks {
    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.contains(id)
    }

    pub fn note(&self, id: &str) -> Option<&str> {
        self.notes.get(id).map(String::as_str)
    }
}

pub struct Preferences {
    store: Box<dyn KvStore>,
}

impl Preferences {
    pub fn new(store: Box<dyn KvStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(kv::MemKv::new()))
    }

    pub fn store(&self) -> &dyn KvStore {
        self.store.as_ref()
    }

    // Stored as {"<id>": true}; only `true` entries count.
    fn favorite_map(&self) -> BTreeMap<ItemId, bool> {
        kv::load(self.store(), FAVORITES_KEY, BTreeMap::new())
    }

    fn favorite_map_for_update(&self) -> anyhow::Result<BTreeMap<ItemId, bool>> {
        kv::load_for_update(self.store(), FAVORITES_KEY, BTreeMap::new())
    }

    fn notes_for_update(&self) -> anyhow::Result<BTreeMap<ItemId, String>> {
        kv::load_for_update(self.store(), NOTES_KEY, BTreeMap::new())
    }

    pub fn favorites(&self) -> BTreeSet<ItemId> {
        self.favorite_map()
            .into_iter()
            .filter_map(|(id, on)| on.then_some(id))
            .collect()
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorite_map().get(id).copied().unwrap_or(false)
    }

    pub fn set_favorite(&self, id: &str, fav: bool) -> anyhow::Result<()> {
        let mut map = self.favorite_map_for_update()?;
        if fav {
            map.insert(id.to_string(), true);
        } else {
            map.remove(id);
        }
        kv::save(self.store(), FAVORITES_KEY, &map)
    }

    /// Flips the favorite flag and returns the new state.
    pub fn toggle_favorite(&self, id: &str) -> anyhow::Result<bool> {
        let next = !self.is_favorite(id);
        self.set_favorite(id, next)?;
        tracing::debug!(id, favorite = next, "favorite toggled");
        Ok(next)
    }

    pub fn notes(&self) -> BTreeMap<ItemId, String> {
        kv::load(self.store(), NOTES_KEY, BTreeMap::new())
    }

    /// Empty string when there is no note.
    pub fn note(&self, id: &str) -> String {
        self.notes().remove(id).unwrap_or_default()
    }

    /// Saves the trimmed text; blank text deletes the note.
    pub fn set_note(&self, id: &str, text: &str) -> anyhow::Result<()> {
        let mut notes = self.notes_for_update()?;
        let text = text.trim();
        if text.is_empty() {
            notes.remove(id);
        } else {
            notes.insert(id.to_string(), text.to_string());
        }
        kv::save(self.store(), NOTES_KEY, &notes)
    }

    pub fn theme(&self) -> Theme {
        match self.store.get_raw(THEME_KEY) {
            Ok(Some(raw)) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "stored theme is invalid, using default");
                Theme::default()
            }),
            Ok(None) => Theme::default(),
            Err(e) => {
                tracing::warn!(error = %e, "theme read failed, using default");
                Theme::default()
            }
        }
    }

    pub fn set_theme(&self, theme: Theme) -> anyhow::Result<()> {
        self.store.set_raw(THEME_KEY, theme.as_str())
    }

    pub fn toggle_theme(&self) -> anyhow::Result<Theme> {
        let next = self.theme().toggled();
        self.set_theme(next)?;
        Ok(next)
    }

    pub fn marks(&self) -> Marks {
        Marks {
            favorites: self.favorites(),
            notes: self.notes(),
        }
    }

    /// Drops favorites and notes whose ids are not in `live`. Only runs when asked.
    pub fn forget_missing(&self, live: &HashSet<&str>) -> anyhow::Result<usize> {
        let mut favs = self.favorite_map_for_update()?;
        let mut notes = self.notes_for_update()?;
        let before = favs.len() + notes.len();
        favs.retain(|id, _| live.contains(id.as_str()));
        notes.retain(|id, _| live.contains(id.as_str()));
        let removed = before - favs.len() - notes.len();
        if removed > 0 {
            kv::save(self.store(), FAVORITES_KEY, &favs)?;
            kv::save(self.store(), NOTES_KEY, &notes)?;
        }
        Ok(removed)
    }
}
