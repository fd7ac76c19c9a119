//! Pure filtering and ordering of the collection. Nothing here mutates its input.

use crate::prefs::Marks;
use crate::{Error, Item};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;

static ALLOWED_QUERY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{Nd} _#-]*$").expect("valid query pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortMode {
    Newest,
    Az,
    Za,
    Fav,
}

impl SortMode {
    pub const ALL: [SortMode; 4] = [SortMode::Newest, SortMode::Az, SortMode::Za, SortMode::Fav];

    /// `None` for anything unrecognised; callers treat that as "keep input order".
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "newest" => Some(SortMode::Newest),
            "az" => Some(SortMode::Az),
            "za" => Some(SortMode::Za),
            "fav" => Some(SortMode::Fav),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortMode::Newest => "newest",
            SortMode::Az => "az",
            SortMode::Za => "za",
            SortMode::Fav => "fav",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortMode::Newest => "Newest",
            SortMode::Az => "A → Z",
            SortMode::Za => "Z → A",
            SortMode::Fav => "Favorites first",
        }
    }

    pub fn next(self) -> Self {
        match self {
            SortMode::Newest => SortMode::Az,
            SortMode::Az => SortMode::Za,
            SortMode::Za => SortMode::Fav,
            SortMode::Fav => SortMode::Newest,
        }
    }
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn normalize(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Accepts blank input or letters, digits, spaces, `-`, `_` and `#`. Returns the trimmed text.
pub fn validate_query(raw: &str) -> Result<String, Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || ALLOWED_QUERY.is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(Error::InvalidQuery {
            query: raw.to_string(),
        })
    }
}

/// Case-insensitive substring match on filename or note.
pub fn filter<'a>(items: &'a [Item], query: &str, marks: &Marks) -> Vec<&'a Item> {
    let q = normalize(query);
    if q.is_empty() {
        return items.iter().collect();
    }
    items
        .iter()
        .filter(|it| {
            it.filename.to_lowercase().contains(&q)
                || marks
                    .note(&it.id)
                    .map(|n| n.to_lowercase().contains(&q))
                    .unwrap_or(false)
        })
        .collect()
}

// Case-folded first so "b" sits next to "B"; raw order breaks ties.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Stable reorder of a copy of `view`. `None` leaves the order as is.
pub fn sort<'a>(view: &[&'a Item], mode: Option<SortMode>, marks: &Marks) -> Vec<&'a Item> {
    let mut out = view.to_vec();
    match mode {
        None => {}
        Some(SortMode::Newest) => out.sort_by(|a, b| b.added_at.cmp(&a.added_at)),
        Some(SortMode::Az) => out.sort_by(|a, b| compare_names(&a.filename, &b.filename)),
        Some(SortMode::Za) => out.sort_by(|a, b| compare_names(&b.filename, &a.filename)),
        Some(SortMode::Fav) => out.sort_by(|a, b| {
            marks
                .is_favorite(&b.id)
                .cmp(&marks.is_favorite(&a.id))
                .then_with(|| b.added_at.cmp(&a.added_at))
        }),
    }
    out
}

pub fn derive_view<'a>(
    items: &'a [Item],
    query: &str,
    mode: Option<SortMode>,
    marks: &Marks,
) -> Vec<&'a Item> {
    let matched = filter(items, query, marks);
    sort(&matched, mode, marks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Duration, OffsetDateTime};

    fn item(id: &str, filename: &str, secs: i64) -> Item {
        Item {
            id: id.into(),
            source_url: format!("http://x/{id}"),
            display_url: format!("http://x/{id}"),
            filename: filename.into(),
            added_at: OffsetDateTime::UNIX_EPOCH + Duration::seconds(secs),
        }
    }

    fn ids(v: &[&Item]) -> Vec<String> {
        v.iter().map(|i| i.id.clone()).collect()
    }

    fn sample() -> Vec<Item> {
        vec![
            item("1", "banana.jpg", 20),
            item("2", "Coffee_ABC.jpg", 30),
            item("3", "apple.jpg", 10),
            item("4", "cherry.jpg", 40),
        ]
    }

    #[test]
    fn blank_query_is_identity() {
        let items = sample();
        let marks = Marks::default();
        for q in ["", "   ", "\t"] {
            assert_eq!(ids(&filter(&items, q, &marks)), ["1", "2", "3", "4"]);
        }
    }

    #[test]
    fn filter_is_case_insensitive() {
        let items = sample();
        let marks = Marks::default();
        assert_eq!(ids(&filter(&items, "abc", &marks)), ["2"]);
        assert_eq!(ids(&filter(&items, "  APPLE ", &marks)), ["3"]);
        assert!(filter(&items, "durian", &marks).is_empty());
    }

    #[test]
    fn filter_matches_notes() {
        let items = sample();
        let mut marks = Marks::default();
        marks.notes.insert("4".into(), "Morning Espresso".into());
        assert_eq!(ids(&filter(&items, "espresso", &marks)), ["4"]);
    }

    #[test]
    fn newest_orders_by_added_at_desc() {
        let items = sample();
        let view: Vec<&Item> = items.iter().collect();
        let sorted = sort(&view, Some(SortMode::Newest), &Marks::default());
        assert_eq!(ids(&sorted), ["4", "2", "1", "3"]);
        // input untouched
        assert_eq!(ids(&view), ["1", "2", "3", "4"]);
    }

    #[test]
    fn za_reverses_az() {
        let items = sample();
        let marks = Marks::default();
        let view: Vec<&Item> = items.iter().collect();
        let az = sort(&view, Some(SortMode::Az), &marks);
        assert_eq!(ids(&az), ["3", "1", "4", "2"]);
        let za = sort(&az, Some(SortMode::Za), &marks);
        let mut reversed = ids(&az);
        reversed.reverse();
        assert_eq!(ids(&za), reversed);
    }

    #[test]
    fn fav_puts_favorites_first_each_group_newest_first() {
        let items = sample();
        let mut marks = Marks::default();
        marks.favorites.insert("3".into());
        marks.favorites.insert("1".into());
        let view: Vec<&Item> = items.iter().collect();
        let sorted = sort(&view, Some(SortMode::Fav), &marks);
        assert_eq!(ids(&sorted), ["1", "3", "4", "2"]);
    }

    #[test]
    fn unknown_mode_keeps_order() {
        let items = sample();
        let view: Vec<&Item> = items.iter().collect();
        let mode = SortMode::parse("shuffle");
        assert_eq!(mode, None);
        assert_eq!(ids(&sort(&view, mode, &Marks::default())), ["1", "2", "3", "4"]);
    }

    #[test]
    fn query_validation() {
        assert_eq!(validate_query("  latte art ").unwrap(), "latte art");
        assert_eq!(validate_query("").unwrap(), "");
        assert!(validate_query("#fav_1-2").is_ok());
        assert!(validate_query("café").is_ok());
        assert!(matches!(
            validate_query("abc!"),
            Err(Error::InvalidQuery { .. })
        ));
        assert!(validate_query("a.jpg").is_err());
    }

    #[test]
    fn sort_modes_cycle_and_round_trip() {
        for m in SortMode::ALL {
            assert_eq!(SortMode::parse(m.as_str()), Some(m));
        }
        assert_eq!(SortMode::Fav.next(), SortMode::Newest);
    }
}
