//! Filesystem notifications for the store and the descriptor directories.

use crate::store::StoreChange;
use crate::store::file::STORE_EXTENSION;
use calloop::channel::Sender;
use log::{debug, error};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Store(StoreChange),
    /// Something changed inside a watched descriptor directory.
    Descriptors(PathBuf),
}

/// Maps a path under the store root to the key it holds. Temp files and
/// foreign files yield `None`.
pub fn store_change_for(store_root: &Path, path: &Path) -> Option<StoreChange> {
    if path.parent()? != store_root {
        return None;
    }
    if path.extension()?.to_str()? != STORE_EXTENSION {
        return None;
    }
    let key = path.file_stem()?.to_str()?;
    if key.is_empty() || key.starts_with('.') {
        return None;
    }
    Some(StoreChange { key: key.to_string() })
}

fn classify(store_root: &Path, path: &Path) -> Option<WatchEvent> {
    if let Some(change) = store_change_for(store_root, path) {
        return Some(WatchEvent::Store(change));
    }
    if path.starts_with(store_root) {
        return None;
    }
    let dir = if path.is_dir() { path } else { path.parent()? };
    Some(WatchEvent::Descriptors(dir.to_path_buf()))
}

pub struct ChangeWatcher {
    watcher: RecommendedWatcher,
    watched: HashSet<PathBuf>,
}

impl ChangeWatcher {
    /// Starts watching `store_root`, creating it when missing.
    pub fn new(store_root: &Path, tx: Sender<WatchEvent>) -> anyhow::Result<Self> {
        std::fs::create_dir_all(store_root)?;
        let root = store_root.to_path_buf();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)) {
                    return;
                }
                let mut sent: Vec<WatchEvent> = Vec::new();
                for change in event.paths.iter().filter_map(|path| classify(&root, path)) {
                    if sent.contains(&change) {
                        continue;
                    }
                    if tx.send(change.clone()).is_err() {
                        debug!("Watch event dropped, event loop is gone");
                        return;
                    }
                    sent.push(change);
                }
            }
            Err(e) => error!("watch error: {:?}", e),
        })?;
        watcher.watch(store_root, RecursiveMode::NonRecursive)?;

        let mut watched = HashSet::new();
        watched.insert(store_root.to_path_buf());
        Ok(Self { watcher, watched })
    }

    /// Adds directories not yet watched. Failures are logged and skipped.
    pub fn watch_dirs(&mut self, dirs: &[PathBuf]) {
        for dir in dirs {
            if self.watched.contains(dir) {
                continue;
            }
            match self.watcher.watch(dir, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    debug!("Watching {:?}", dir);
                    self.watched.insert(dir.clone());
                }
                Err(e) => debug!("Cannot watch {:?}: {}", dir, e),
            }
        }
    }

    pub fn watched(&self) -> usize {
        self.watched.len()
    }
}
