//! In-memory mirror of the installed shortcuts persisted in the configuration store.

use crate::error::{StoreError, TrackerError};
use crate::model::{InstalledShortcut, Params, ShortcutId};
use crate::store::{ConfigStore, Section};
use log::{debug, info};

/// How a domain lays out its installed shortcuts in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// A plain string list; every identifier is its own item key.
    List { key: String },
    /// One section per identifier; `item_field` names the backing item.
    Sections { key: String, item_field: String },
}

impl Layout {
    pub fn key(&self) -> &str {
        match self {
            Layout::List { key } | Layout::Sections { key, .. } => key,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledSet {
    shortcuts: Vec<InstalledShortcut>,
}

impl InstalledSet {
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&InstalledShortcut> {
        self.shortcuts.iter().find(|s| s.id.as_str() == id)
    }

    pub fn ids_for_key<'a>(&'a self, item_key: &'a str) -> impl Iterator<Item = &'a ShortcutId> + 'a {
        self.shortcuts
            .iter()
            .filter(move |s| s.item_key.as_deref() == Some(item_key))
            .map(|s| &s.id)
    }

    pub fn maps_key(&self, item_key: &str) -> bool {
        self.ids_for_key(item_key).next().is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstalledShortcut> {
        self.shortcuts.iter()
    }

    pub fn len(&self) -> usize {
        self.shortcuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shortcuts.is_empty()
    }

    fn upsert(&mut self, shortcut: InstalledShortcut) {
        match self.shortcuts.iter_mut().find(|s| s.id == shortcut.id) {
            Some(existing) => *existing = shortcut,
            None => self.shortcuts.push(shortcut),
        }
    }

    fn remove(&mut self, id: &str) -> Option<InstalledShortcut> {
        let index = self.shortcuts.iter().position(|s| s.id.as_str() == id)?;
        Some(self.shortcuts.remove(index))
    }
}

/// Cache of one store key. It is the only local writer of that key, but the
/// store stays the source of truth: [`Tracker::load`] may replace everything.
pub struct Tracker {
    layout: Layout,
    store: Box<dyn ConfigStore>,
    set: InstalledSet,
}

impl Tracker {
    pub fn new(layout: Layout, store: Box<dyn ConfigStore>) -> Self {
        Self {
            layout,
            store,
            set: InstalledSet::default(),
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn installed(&self) -> &InstalledSet {
        &self.set
    }

    /// Replaces the cached set from the store. On failure the cache is kept.
    pub fn load(&mut self) -> Result<(), StoreError> {
        let mut set = InstalledSet::default();
        match &self.layout {
            Layout::List { key } => {
                for id in self.store.get_list(key)? {
                    if set.contains(&id) {
                        continue;
                    }
                    set.upsert(InstalledShortcut {
                        id: ShortcutId::new(id.clone()),
                        item_key: Some(id),
                        params: Params::new(),
                    });
                }
            }
            Layout::Sections { key, item_field } => {
                for (name, mut section) in self.store.get_sections(key)? {
                    let item_key = section.remove(item_field);
                    if item_key.is_none() {
                        debug!("Section {} in {} names no item", name, key);
                    }
                    set.upsert(InstalledShortcut {
                        id: ShortcutId::new(name),
                        item_key,
                        params: section,
                    });
                }
            }
        }

        debug!("Loaded {} installed shortcuts from {}", set.len(), self.layout.key());
        self.set = set;
        Ok(())
    }

    /// Appends `id` and persists the whole set. An identifier already present is
    /// refused. No partial success: a failed write restores the previous cache.
    pub fn add(&mut self, id: ShortcutId, item_key: &str, params: Params) -> Result<(), TrackerError> {
        if self.set.contains(id.as_str()) {
            return Err(TrackerError::Duplicate(id));
        }
        let previous = self.set.clone();
        self.set.upsert(InstalledShortcut {
            id: id.clone(),
            item_key: Some(item_key.to_string()),
            params,
        });

        if let Err(e) = self.persist() {
            self.set = previous;
            return Err(e.into());
        }
        info!("Installed shortcut {} for {}", id, item_key);
        Ok(())
    }

    /// Returns whether `id` was present. Removing an absent id writes nothing.
    pub fn remove(&mut self, id: &str) -> Result<bool, StoreError> {
        let previous = self.set.clone();
        if self.set.remove(id).is_none() {
            return Ok(false);
        }

        if let Err(e) = self.persist() {
            self.set = previous;
            return Err(e);
        }
        info!("Removed shortcut {}", id);
        Ok(true)
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        match &self.layout {
            Layout::List { key } => {
                let ids: Vec<String> = self.set.iter().map(|s| s.id.to_string()).collect();
                self.store.set_list(key, &ids)
            }
            Layout::Sections { key, item_field } => {
                let sections = self
                    .set
                    .iter()
                    .map(|s| {
                        let mut section: Section = s.params.clone();
                        if let Some(item_key) = &s.item_key {
                            section.insert(item_field.clone(), item_key.clone());
                        }
                        (s.id.to_string(), section)
                    })
                    .collect();
                self.store.set_sections(key, &sections)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::Sections;

    fn sections_layout() -> Layout {
        Layout::Sections {
            key: "applets".to_string(),
            item_field: "X-Desktop-File".to_string(),
        }
    }

    #[test]
    fn list_layout_add_remove_and_reload() {
        let store = MemoryStore::new();
        let mut tracker = Tracker::new(
            Layout::List {
                key: "task-shortcuts".to_string(),
            },
            Box::new(store.clone()),
        );
        tracker.load().unwrap();
        assert!(tracker.installed().is_empty());

        tracker.add("notes.desktop".into(), "notes.desktop", Params::new()).unwrap();
        assert!(tracker.installed().maps_key("notes.desktop"));
        assert_eq!(store.get_list("task-shortcuts").unwrap(), vec!["notes.desktop"]);

        assert!(tracker.remove("notes.desktop").unwrap());
        assert!(!tracker.remove("notes.desktop").unwrap());
        assert_eq!(store.writes(), 2);
        assert!(store.get_list("task-shortcuts").unwrap().is_empty());
    }

    #[test]
    fn list_layout_ignores_duplicates() {
        let mut store = MemoryStore::new();
        store
            .set_list("task-shortcuts", &["a".to_string(), "b".to_string(), "a".to_string()])
            .unwrap();
        let mut tracker = Tracker::new(
            Layout::List {
                key: "task-shortcuts".to_string(),
            },
            Box::new(store),
        );
        tracker.load().unwrap();
        assert_eq!(tracker.installed().len(), 2);
    }

    #[test]
    fn sections_keep_params_and_nameless_ids() {
        let mut store = MemoryStore::new();
        let mut clock = Section::new();
        clock.insert("X-Desktop-File".to_string(), "/p/clock.desktop".to_string());
        clock.insert("X-View".to_string(), "2".to_string());
        let sections: Sections = vec![
            ("clock.desktop-0".to_string(), clock),
            ("orphan".to_string(), Section::new()),
        ];
        store.set_sections("applets", &sections).unwrap();

        let mut tracker = Tracker::new(sections_layout(), Box::new(store.clone()));
        tracker.load().unwrap();
        let installed = tracker.installed();
        assert!(installed.contains("orphan"));
        assert_eq!(installed.get("orphan").unwrap().item_key, None);
        let clock = installed.get("clock.desktop-0").unwrap();
        assert_eq!(clock.item_key.as_deref(), Some("/p/clock.desktop"));
        assert_eq!(clock.params.get("X-View").map(String::as_str), Some("2"));

        tracker.remove("orphan").unwrap();
        assert_eq!(store.get_sections("applets").unwrap(), vec![sections[0].clone()]);
    }

    #[test]
    fn failed_write_rolls_back() {
        let store = MemoryStore::new();
        let mut tracker = Tracker::new(sections_layout(), Box::new(store.clone()));
        tracker.add("a-0".into(), "/p/a", Params::new()).unwrap();
        let before = tracker.installed().clone();

        store.fail_writes(true);
        assert!(tracker.add("a-1".into(), "/p/a", Params::new()).is_err());
        assert_eq!(*tracker.installed(), before);
        assert!(tracker.remove("a-0").is_err());
        assert_eq!(*tracker.installed(), before);

        store.fail_writes(false);
        tracker.load().unwrap();
        assert_eq!(*tracker.installed(), before);
    }

    #[test]
    fn add_refuses_existing_identifier() {
        let store = MemoryStore::new();
        let mut tracker = Tracker::new(sections_layout(), Box::new(store.clone()));
        tracker.add("a-0".into(), "/p/a", Params::new()).unwrap();
        let before = tracker.installed().clone();

        let err = tracker.add("a-0".into(), "/p/other", Params::new()).unwrap_err();
        assert!(matches!(err, TrackerError::Duplicate(ref id) if id.as_str() == "a-0"));
        assert_eq!(*tracker.installed(), before);
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn reload_after_own_write_is_stable() {
        let store = MemoryStore::new();
        let mut tracker = Tracker::new(sections_layout(), Box::new(store));
        let mut params = Params::new();
        params.insert("X-View".to_string(), "1".to_string());
        tracker.add("bg-0".into(), "beach.desktop", params).unwrap();
        let written = tracker.installed().clone();

        tracker.load().unwrap();
        assert_eq!(*tracker.installed(), written);
        tracker.load().unwrap();
        assert_eq!(*tracker.installed(), written);
    }
}
