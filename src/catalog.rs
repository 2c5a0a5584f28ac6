//! Item catalog: the authoritative "what exists" table of one domain.

use crate::model::ItemRecord;
use log::debug;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

/// Immutable view of a catalog, shared with scan threads.
pub type CatalogSnapshot = Arc<HashMap<String, ItemRecord>>;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CatalogDiff {
    pub appeared: Vec<String>,
    pub disappeared: Vec<String>,
    pub updated: Vec<String>,
}

impl CatalogDiff {
    pub fn is_empty(&self) -> bool {
        self.appeared.is_empty() && self.disappeared.is_empty() && self.updated.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ItemCatalog {
    items: CatalogSnapshot,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole table at once. The first record for a key wins.
    pub fn rebuild(&mut self, records: Vec<ItemRecord>) -> CatalogDiff {
        let mut next = HashMap::with_capacity(records.len());
        for record in records {
            match next.entry(record.key.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
                Entry::Occupied(existing) => {
                    debug!(
                        "Duplicate item key {}: keeping {:?}, ignoring {:?}",
                        existing.key(),
                        existing.get().source,
                        record.source
                    );
                }
            }
        }

        let mut diff = CatalogDiff::default();
        for (key, record) in &next {
            match self.items.get(key) {
                None => diff.appeared.push(key.clone()),
                Some(old) if old != record => diff.updated.push(key.clone()),
                Some(_) => {}
            }
        }
        diff.disappeared = self
            .items
            .keys()
            .filter(|key| !next.contains_key(*key))
            .cloned()
            .collect();
        diff.appeared.sort();
        diff.updated.sort();
        diff.disappeared.sort();

        self.items = Arc::new(next);
        diff
    }

    pub fn lookup(&self, key: &str) -> Option<&ItemRecord> {
        self.items.get(key)
    }

    /// Unordered; callers sort for presentation.
    pub fn all(&self) -> impl Iterator<Item = &ItemRecord> {
        self.items.values()
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        Arc::clone(&self.items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::ItemKind;
    use std::path::PathBuf;

    pub(crate) fn record(key: &str, name: &str, multiple: bool) -> ItemRecord {
        ItemRecord {
            key: key.to_string(),
            name: name.to_string(),
            icon: None,
            order: 0,
            multiple,
            source: PathBuf::from(format!("/descriptors/{}", key)),
            kind: ItemKind::Applet { module: None },
        }
    }

    #[test]
    fn rebuild_reports_diff() {
        let mut catalog = ItemCatalog::new();
        let diff = catalog.rebuild(vec![record("a", "A", false), record("b", "B", false)]);
        assert_eq!(diff.appeared, vec!["a", "b"]);
        assert!(diff.disappeared.is_empty());

        let diff = catalog.rebuild(vec![record("b", "Bee", false), record("c", "C", true)]);
        assert_eq!(diff.appeared, vec!["c"]);
        assert_eq!(diff.disappeared, vec!["a"]);
        assert_eq!(diff.updated, vec!["b"]);
        assert_eq!(catalog.lookup("b").map(|r| r.name.as_str()), Some("Bee"));
        assert!(catalog.lookup("a").is_none());
    }

    #[test]
    fn rebuild_is_idempotent() {
        let input = vec![record("a", "A", false), record("b", "B", true)];
        let mut catalog = ItemCatalog::new();
        catalog.rebuild(input.clone());
        let first = catalog.snapshot();

        let diff = catalog.rebuild(input);
        assert!(diff.is_empty());
        assert_eq!(*first, *catalog.snapshot());
    }

    #[test]
    fn snapshots_survive_rebuild() {
        let mut catalog = ItemCatalog::new();
        catalog.rebuild(vec![record("a", "A", false)]);
        let old = catalog.snapshot();
        catalog.rebuild(vec![]);
        assert_eq!(old.len(), 1);
        assert!(catalog.is_empty());
    }

    #[test]
    fn first_duplicate_wins() {
        let mut catalog = ItemCatalog::new();
        let mut second = record("a", "Second", false);
        second.source = PathBuf::from("/other/a");
        catalog.rebuild(vec![record("a", "First", false), second]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.lookup("a").unwrap().name, "First");
    }
}
