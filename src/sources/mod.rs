use anyhow::Result;
use std::path::PathBuf;

/// A descriptor found by a source, with the catalog key it will be filed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: PathBuf,
    pub key: String,
}

#[derive(Debug, Default)]
pub struct Discovery {
    pub locations: Vec<Location>,
    /// Directories visited on the way, candidates for change watching.
    pub directories: Vec<PathBuf>,
}

pub trait Source: Send + Sync {
    fn name(&self) -> &str;

    fn discover(&self) -> Result<Discovery>;

    /// Whether records already in the catalog can be reused instead of re-parsed.
    fn reuses_seen(&self) -> bool {
        false
    }
}

pub mod plugins;
pub mod tree;
