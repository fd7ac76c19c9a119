//! Application state: the collection plus the current search, sort and busy flag.
//!
//! Every user action maps to one method here. The presentation layer only reads `view()`.

use crate::collection::Collection;
use crate::prefs::Preferences;
use crate::query::{self, SortMode};
use crate::source::{parse_count, ItemSource, Probe};
use crate::{Error, Item, Theme};
use std::collections::HashSet;
use std::num::NonZeroUsize;

/// One row of the derived view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewItem {
    pub item: Item,
    pub favorite: bool,
    pub note: Option<String>,
}

pub struct Gallery<P> {
    collection: Collection,
    prefs: Preferences,
    source: ItemSource<P>,
    query: String,
    sort: Option<SortMode>,
    busy: bool,
}

impl<P: Probe> Gallery<P> {
    pub fn new(source: ItemSource<P>, prefs: Preferences) -> Self {
        Self {
            collection: Collection::new(),
            prefs,
            source,
            query: String::new(),
            sort: Some(SortMode::Newest),
            busy: false,
        }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn prefs(&self) -> &Preferences {
        &self.prefs
    }

    pub fn source(&self) -> &ItemSource<P> {
        &self.source
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn sort(&self) -> Option<SortMode> {
        self.sort
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Rejected input keeps the previous query.
    pub fn set_query(&mut self, raw: &str) -> Result<(), Error> {
        let query = query::validate_query(raw)?;
        tracing::debug!(%query, "query applied");
        self.query = query;
        Ok(())
    }

    /// Unknown names switch to insertion order.
    pub fn set_sort(&mut self, raw: &str) -> Option<SortMode> {
        let mode = SortMode::parse(raw);
        if mode.is_none() {
            tracing::warn!(mode = raw, "unknown sort mode, keeping collection order");
        }
        self.sort = mode;
        mode
    }

    pub fn set_sort_mode(&mut self, mode: SortMode) {
        self.sort = Some(mode);
    }

    pub fn cycle_sort(&mut self) -> SortMode {
        let next = self.sort.map(SortMode::next).unwrap_or(SortMode::Newest);
        self.sort = Some(next);
        next
    }

    /// Validates the count and marks the gallery busy. Pair with `finish_brew`.
    pub fn begin_brew(&mut self, count: &str) -> Result<NonZeroUsize, Error> {
        if self.busy {
            return Err(Error::Busy);
        }
        let n = parse_count(count)?;
        self.busy = true;
        Ok(n)
    }

    /// Clears busy whatever the outcome; only a complete batch reaches the collection.
    pub fn finish_brew(&mut self, fetched: Result<Vec<Item>, Error>) -> Result<usize, Error> {
        self.busy = false;
        let batch = fetched?;
        let n = batch.len();
        self.collection.prepend_batch(batch);
        tracing::info!(added = n, total = self.collection.len(), "batch added");
        Ok(n)
    }

    pub fn brew(&mut self, count: &str) -> Result<usize, Error> {
        let n = self.begin_brew(count)?;
        let fetched = self.source.fetch_batch(n);
        self.finish_brew(fetched)
    }

    pub fn clear(&mut self) {
        tracing::info!(removed = self.collection.len(), "collection cleared");
        self.collection.clear();
    }

    fn require(&self, id: &str) -> Result<&Item, Error> {
        self.collection
            .get(id)
            .ok_or_else(|| Error::UnknownItem(id.to_string()))
    }

    pub fn toggle_favorite(&self, id: &str) -> Result<bool, Error> {
        self.require(id)?;
        Ok(self.prefs.toggle_favorite(id)?)
    }

    pub fn save_note(&self, id: &str, text: &str) -> Result<(), Error> {
        self.require(id)?;
        Ok(self.prefs.set_note(id, text)?)
    }

    pub fn note(&self, id: &str) -> String {
        self.prefs.note(id)
    }

    pub fn theme(&self) -> Theme {
        self.prefs.theme()
    }

    pub fn toggle_theme(&self) -> Result<Theme, Error> {
        Ok(self.prefs.toggle_theme()?)
    }

    /// Filtered, then sorted. Computed fresh on every call.
    pub fn view(&self) -> Vec<ViewItem> {
        let marks = self.prefs.marks();
        query::derive_view(self.collection.items(), &self.query, self.sort, &marks)
            .into_iter()
            .map(|it| ViewItem {
                favorite: marks.is_favorite(&it.id),
                note: marks.note(&it.id).map(str::to_string),
                item: it.clone(),
            })
            .collect()
    }

    /// Message for an image that stopped loading after display. The item stays put.
    pub fn report_render_failure(&self, id: &str) -> Option<String> {
        self.collection.get(id).map(|it| {
            tracing::warn!(id, url = %it.display_url, "image failed to render");
            format!(
                "Couldn't load {}. It stays in the gallery; brew again for a fresh one.",
                it.filename
            )
        })
    }

    /// Re-probes an item's display address on request. `Some(message)` when it fails.
    pub fn check_display(&self, id: &str) -> Result<Option<String>, Error> {
        let item = self.require(id)?;
        match self.source.probe().probe(&item.display_url) {
            Ok(()) => Ok(None),
            Err(e) => {
                tracing::debug!(id, error = %e, "display check failed");
                Ok(self.report_render_failure(id))
            }
        }
    }

    /// Drops favorites and notes for items no longer in memory.
    pub fn forget_missing(&self) -> Result<usize, Error> {
        let live: HashSet<&str> = self.collection.ids().collect();
        Ok(self.prefs.forget_missing(&live)?)
    }
}
