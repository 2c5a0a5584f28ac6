//! Items currently eligible to be offered for installation.

use crate::catalog::ItemCatalog;
use crate::matcher::FuzzyMatcher;
use crate::model::ItemRecord;
use crate::tracker::InstalledSet;

/// Pure projection of (catalog, installed set): multi-instance items always,
/// single-instance items only while nothing installed maps to them.
#[derive(Debug, Clone, Default)]
pub struct FilteredView {
    items: Vec<ItemRecord>,
}

impl FilteredView {
    pub fn compute(catalog: &ItemCatalog, installed: &InstalledSet) -> Self {
        let mut items: Vec<ItemRecord> = catalog
            .all()
            .filter(|item| item.multiple || !installed.maps_key(&item.key))
            .cloned()
            .collect();

        items.sort_by(|a, b| {
            a.order
                .cmp(&b.order)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
                .then_with(|| a.key.cmp(&b.key))
        });
        Self { items }
    }

    pub fn items(&self) -> &[ItemRecord] {
        &self.items
    }

    #[cfg(test)]
    pub fn contains(&self, key: &str) -> bool {
        self.items.iter().any(|item| item.key == key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items whose name matches `query`, best match first. An empty query keeps the order.
    pub fn search(&self, query: &str, matcher: &mut FuzzyMatcher) -> Vec<&ItemRecord> {
        if query.is_empty() {
            return self.items.iter().collect();
        }

        let mut scored: Vec<(u32, &ItemRecord)> = self
            .items
            .iter()
            .filter_map(|item| matcher.score(query, &item.name).map(|score| (score, item)))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().map(|(_, item)| item).collect()
    }
}
