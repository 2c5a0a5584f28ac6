//! In-memory store for tests, with injectable write failures.

use crate::error::StoreError;
use crate::store::{ConfigStore, Sections};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Inner {
    lists: HashMap<String, Vec<String>>,
    sections: HashMap<String, Sections>,
    fail_writes: bool,
    writes: usize,
}

/// Clones share state, so a test can keep a handle and play "another process".
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.inner.lock().unwrap().fail_writes = fail;
    }

    pub fn writes(&self) -> usize {
        self.inner.lock().unwrap().writes
    }

    fn check_write(inner: &mut Inner, key: &str) -> Result<(), StoreError> {
        if inner.fail_writes {
            return Err(StoreError::Io {
                path: PathBuf::from(key),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "injected failure"),
            });
        }
        inner.writes += 1;
        Ok(())
    }
}

impl ConfigStore for MemoryStore {
    fn get_list(&self, key: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.inner.lock().unwrap().lists.get(key).cloned().unwrap_or_default())
    }

    fn set_list(&mut self, key: &str, values: &[String]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_write(&mut inner, key)?;
        inner.lists.insert(key.to_string(), values.to_vec());
        Ok(())
    }

    fn get_sections(&self, key: &str) -> Result<Sections, StoreError> {
        Ok(self.inner.lock().unwrap().sections.get(key).cloned().unwrap_or_default())
    }

    fn set_sections(&mut self, key: &str, sections: &Sections) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_write(&mut inner, key)?;
        inner.sections.insert(key.to_string(), sections.clone());
        Ok(())
    }
}
