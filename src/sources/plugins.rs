use crate::sources::{Discovery, Location, Source};
use anyhow::Result;
use log::{debug, info};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

/// Flat list of plugin descriptor paths, as published by the plugin configuration.
///
/// The list is either given explicitly or gathered from plugin directories
/// (one level, `*.desktop`). Paths already in the catalog are not re-parsed.
#[derive(Debug, Clone, Default)]
pub struct PluginListSource {
    dirs: Vec<PathBuf>,
    paths: Vec<PathBuf>,
}

impl PluginListSource {
    pub fn from_dirs(dirs: Vec<PathBuf>) -> Self {
        Self { dirs, paths: Vec::new() }
    }

    #[cfg(test)]
    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self { dirs: Vec::new(), paths }
    }

    fn all_plugin_paths(&self) -> Vec<PathBuf> {
        let mut all = self.paths.clone();
        for dir in &self.dirs {
            if !dir.exists() {
                debug!("Plugin directory {:?} does not exist, skipping", dir);
                continue;
            }
            debug!("Listing plugins in {:?}", dir);
            if let Ok(read_dir) = fs::read_dir(dir) {
                let mut found: Vec<PathBuf> = read_dir
                    .flatten()
                    .map(|entry| entry.path())
                    .filter(|path| path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("desktop"))
                    .collect();
                found.sort();
                all.extend(found);
            }
        }
        all
    }
}

impl Source for PluginListSource {
    fn name(&self) -> &str {
        "plugins"
    }

    fn discover(&self) -> Result<Discovery> {
        let mut seen = HashSet::new();
        let mut discovery = Discovery {
            directories: self.dirs.iter().filter(|d| d.exists()).cloned().collect(),
            ..Discovery::default()
        };

        for path in self.all_plugin_paths() {
            if !path.is_absolute() {
                debug!("Ignoring relative plugin path {:?}", path);
                continue;
            }
            if !seen.insert(path.clone()) {
                continue;
            }
            discovery.locations.push(Location {
                key: path.to_string_lossy().to_string(),
                path,
            });
        }

        info!("PluginListSource: {} plugin descriptors", discovery.locations.len());
        Ok(discovery)
    }

    fn reuses_seen(&self) -> bool {
        true
    }
}
