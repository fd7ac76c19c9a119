use crate::Item;

/// In-memory items, newest batch first. Grows by whole batches, shrinks only by `clear`.
#[derive(Debug, Default, Clone)]
pub struct Collection {
    items: Vec<Item>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts `batch` in front of everything already held, keeping the batch's own order.
    pub fn prepend_batch(&mut self, batch: Vec<Item>) {
        let mut next = batch;
        next.reserve(self.items.len());
        next.append(&mut self.items);
        self.items = next;
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|i| i.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn item(id: &str) -> Item {
        Item {
            id: id.into(),
            source_url: format!("http://x/{id}"),
            display_url: format!("http://x/{id}"),
            filename: format!("{id}.jpg"),
            added_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn prepend_puts_batch_first_in_batch_order() {
        let mut c = Collection::new();
        c.prepend_batch(vec![item("a"), item("b")]);
        c.prepend_batch(vec![item("c"), item("d"), item("e")]);
        assert_eq!(c.len(), 5);
        let ids: Vec<&str> = c.ids().collect();
        assert_eq!(ids, ["c", "d", "e", "a", "b"]);
        assert_eq!(c.get("a").map(|i| i.filename.as_str()), Some("a.jpg"));
    }

    #[test]
    fn clear_empties() {
        let mut c = Collection::new();
        c.prepend_batch(vec![item("a")]);
        c.clear();
        assert!(c.is_empty());
        c.prepend_batch(Vec::new());
        assert!(c.is_empty());
    }
}
