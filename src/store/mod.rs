//! Configuration store holding the persisted installed shortcuts.
//!
//! Keys name either a list of strings or an ordered set of sections. The store is
//! shared with other processes; readers must expect it to change underneath them.

use crate::error::StoreError;
use std::collections::BTreeMap;

pub type Section = BTreeMap<String, String>;
pub type Sections = Vec<(String, Section)>;

pub trait ConfigStore: Send {
    fn get_list(&self, key: &str) -> Result<Vec<String>, StoreError>;

    fn set_list(&mut self, key: &str, values: &[String]) -> Result<(), StoreError>;

    fn get_sections(&self, key: &str) -> Result<Sections, StoreError>;

    /// Replaces every section under `key` in one write.
    fn set_sections(&mut self, key: &str, sections: &Sections) -> Result<(), StoreError>;
}

/// A key in the store changed, through any path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub key: String,
}

pub mod file;
#[cfg(test)]
pub mod memory;
