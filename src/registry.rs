//! Per-domain facade over catalog, installed-set tracker and filtered view.

use crate::allocator;
use crate::catalog::ItemCatalog;
use crate::descriptor::DescriptorParser;
use crate::error::RegistryError;
use crate::executor::Launcher;
use crate::model::{Domain, ItemKind, ItemRecord, Params, ShortcutId};
use crate::scan::{CancelToken, ScanJob, ScanOutcome};
use crate::sources::Source;
use crate::store::{ConfigStore, StoreChange};
use crate::tracker::{InstalledSet, Layout, Tracker};
use crate::view::FilteredView;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;

pub const PARAM_URL: &str = "X-Url";
pub const PARAM_LABEL: &str = "X-Label";
pub const PARAM_ICON: &str = "X-Icon";

/// Delivered to subscribers after the registry state is fully updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    ItemAppeared { domain: Domain, key: String },
    ItemUpdated { domain: Domain, key: String },
    ItemDisappeared { domain: Domain, key: String },
    ShortcutInstalled { domain: Domain, id: ShortcutId, key: String },
    ShortcutRemoved { domain: Domain, id: ShortcutId },
    /// The installed set was reloaded from the store; the filtered view is stale.
    InstalledReloaded { domain: Domain },
}

pub struct Registry {
    domain: Domain,
    catalog: ItemCatalog,
    tracker: Tracker,
    sources: Vec<Arc<dyn Source>>,
    parser: DescriptorParser,
    generation: u64,
    in_flight: Option<CancelToken>,
    watched_dirs: Vec<PathBuf>,
    subscribers: Vec<mpsc::Sender<RegistryEvent>>,
}

impl Registry {
    /// Creates the registry and loads the installed set. The catalog stays empty
    /// until the first scan is applied.
    pub fn new(
        domain: Domain,
        layout: Layout,
        store: Box<dyn ConfigStore>,
        sources: Vec<Arc<dyn Source>>,
        parser: DescriptorParser,
    ) -> Self {
        let mut tracker = Tracker::new(layout, store);
        if let Err(e) = tracker.load() {
            warn!("Could not load installed {} shortcuts: {}", domain, e);
        }

        Self {
            domain,
            catalog: ItemCatalog::new(),
            tracker,
            sources,
            parser,
            generation: 0,
            in_flight: None,
            watched_dirs: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn installed(&self) -> &InstalledSet {
        self.tracker.installed()
    }

    pub fn store_key(&self) -> &str {
        self.tracker.layout().key()
    }

    pub fn lookup(&self, key: &str) -> Option<&ItemRecord> {
        self.catalog.lookup(key)
    }

    /// The item backing an installed shortcut, if it is still in the catalog.
    pub fn shortcut_item(&self, id: &str) -> Option<&ItemRecord> {
        let key = self.installed().get(id)?.item_key.as_deref()?;
        self.catalog.lookup(key)
    }

    /// Hands the item behind `key` (an item key or a shortcut identifier) to `launcher`.
    pub fn launch(&self, key: &str, launcher: &dyn Launcher) -> anyhow::Result<()> {
        let item = self
            .lookup(key)
            .or_else(|| self.shortcut_item(key))
            .ok_or_else(|| RegistryError::NotFound(format!("{} item or shortcut {}", self.domain, key)))?;
        launcher.launch(item)
    }

    pub fn view(&self) -> FilteredView {
        FilteredView::compute(&self.catalog, self.tracker.installed())
    }

    /// Directories seen by the last applied scan.
    pub fn watched_dirs(&self) -> &[PathBuf] {
        &self.watched_dirs
    }

    pub fn subscribe(&mut self) -> mpsc::Receiver<RegistryEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Prepares a scan of every source. Any scan still in flight is cancelled;
    /// only the newest generation will be applied.
    pub fn begin_scan(&mut self) -> ScanJob {
        self.cancel_scan();
        self.generation += 1;
        let cancel = CancelToken::new();
        self.in_flight = Some(cancel.clone());
        ScanJob::new(
            self.domain,
            self.generation,
            self.sources.clone(),
            self.parser.clone(),
            self.catalog.snapshot(),
            cancel,
        )
    }

    pub fn cancel_scan(&mut self) {
        if let Some(cancel) = self.in_flight.take() {
            cancel.cancel();
        }
    }

    #[cfg(test)]
    pub fn scan_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Rebuilds the catalog from a finished scan. Stale generations are dropped.
    pub fn apply_scan(&mut self, outcome: ScanOutcome) -> bool {
        if outcome.domain != self.domain || outcome.generation != self.generation || self.in_flight.is_none() {
            debug!(
                "Dropping stale {} scan #{} (current #{})",
                outcome.domain, outcome.generation, self.generation
            );
            return false;
        }
        self.in_flight = None;

        let diff = self.catalog.rebuild(outcome.results.records);
        self.watched_dirs = outcome.results.directories;
        if self.catalog.is_empty() {
            warn!("No {} items found", self.domain);
        }
        if diff.is_empty() {
            debug!("{} catalog unchanged", self.domain);
            return true;
        }
        info!(
            "{} catalog rebuilt: {} items (+{} -{} ~{})",
            self.domain,
            self.catalog.len(),
            diff.appeared.len(),
            diff.disappeared.len(),
            diff.updated.len()
        );

        let domain = self.domain;
        for key in diff.appeared {
            self.emit(RegistryEvent::ItemAppeared { domain, key });
        }
        for key in diff.updated {
            self.emit(RegistryEvent::ItemUpdated { domain, key });
        }
        for key in diff.disappeared {
            self.emit(RegistryEvent::ItemDisappeared { domain, key });
        }
        true
    }

    /// Scans on the calling thread and applies the result.
    pub fn scan_now(&mut self) -> bool {
        match self.begin_scan().run() {
            Some(outcome) => self.apply_scan(outcome),
            None => false,
        }
    }

    pub fn install(&mut self, item_key: &str, mut params: Params) -> Result<ShortcutId, RegistryError> {
        let item = self
            .catalog
            .lookup(item_key)
            .ok_or_else(|| RegistryError::NotFound(format!("{} item {}", self.domain, item_key)))?;
        let id = allocator::allocate(self.domain, item, self.tracker.installed())?;

        if let ItemKind::Bookmark { url, favicon } = &item.kind {
            params.insert(PARAM_URL.to_string(), url.clone());
            params.insert(PARAM_LABEL.to_string(), item.name.clone());
            // The favicon is the shortcut thumbnail; the descriptor icon is the fallback.
            if let Some(icon) = favicon.as_ref().or(item.icon.as_ref()) {
                params.insert(PARAM_ICON.to_string(), icon.clone());
            }
        }
        if matches!(self.tracker.layout(), Layout::List { .. }) && !params.is_empty() {
            debug!("{} shortcuts carry no parameters, dropping {:?}", self.domain, params);
            params.clear();
        }

        self.tracker.add(id.clone(), item_key, params)?;
        self.emit(RegistryEvent::ShortcutInstalled {
            domain: self.domain,
            id: id.clone(),
            key: item_key.to_string(),
        });
        Ok(id)
    }

    /// Removes the shortcut together with any auxiliary data stored for it.
    pub fn remove(&mut self, id: &str) -> Result<(), RegistryError> {
        if !self.tracker.remove(id)? {
            return Err(RegistryError::NotFound(format!("{} shortcut {}", self.domain, id)));
        }
        self.emit(RegistryEvent::ShortcutRemoved {
            domain: self.domain,
            id: ShortcutId::new(id),
        });
        Ok(())
    }

    /// Treats every notification as an unknown external change and reloads.
    /// Returns whether the installed set was reloaded.
    pub fn handle_store_change(&mut self, change: &StoreChange) -> bool {
        if change.key != self.store_key() {
            return false;
        }
        if let Err(e) = self.tracker.load() {
            warn!("Could not reload installed {} shortcuts: {}", self.domain, e);
            return false;
        }
        self.emit(RegistryEvent::InstalledReloaded { domain: self.domain });
        true
    }

    fn emit(&mut self, event: RegistryEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.cancel_scan();
    }
}
