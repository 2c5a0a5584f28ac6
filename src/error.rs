use crate::model::{Domain, ShortcutId};
use std::path::PathBuf;
use thiserror::Error;

/// Why a descriptor did not produce a catalog item.
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("could not read {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("missing required key {0}")]
    MissingRequiredField(&'static str),

    #[error("invalid value {value:?} for key {key}")]
    InvalidValue { key: String, value: String },

    /// Well-formed, but declares a type outside the catalog's domain.
    #[error("descriptor type {declared:?} does not apply")]
    NotApplicable { declared: Option<String> },
}

impl DescriptorError {
    pub fn is_not_applicable(&self) -> bool {
        matches!(self, DescriptorError::NotApplicable { .. })
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid store key {0:?}")]
    InvalidKey(String),

    #[error("store io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed store file {path:?}: {message}")]
    Format { path: PathBuf, message: String },
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("shortcut identifier {0} is already installed")]
    Duplicate(ShortcutId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures surfaced to callers of a registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{domain} item {key} is already installed as {id}")]
    AlreadyInstalled {
        domain: Domain,
        key: String,
        id: ShortcutId,
    },

    #[error("shortcut identifier {0} is owned by another item")]
    IdentifierInUse(ShortcutId),

    #[error("{0} not found")]
    NotFound(String),

    #[error("could not persist installed shortcuts: {0}")]
    Persist(#[from] StoreError),
}

impl From<TrackerError> for RegistryError {
    fn from(e: TrackerError) -> Self {
        match e {
            TrackerError::Duplicate(id) => RegistryError::IdentifierInUse(id),
            TrackerError::Store(e) => RegistryError::Persist(e),
        }
    }
}
