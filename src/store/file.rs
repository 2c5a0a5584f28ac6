//! TOML-backed store: one `<key>.toml` file per key under a root directory.
//!
//! Writes go to a temp file in the same directory which is fsynced and then
//! renamed over the target, so readers never see a half-written file.

use crate::error::StoreError;
use crate::store::{ConfigStore, Section, Sections};
use log::debug;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const LIST_FIELD: &str = "values";
pub const STORE_EXTENSION: &str = "toml";

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{}.{}", key, STORE_EXTENSION)))
    }

    fn read_table(&self, key: &str) -> Result<(PathBuf, Option<toml::Table>), StoreError> {
        let path = self.path_for(key)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((path, None)),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        let table = content.parse::<toml::Table>().map_err(|e| StoreError::Format {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Ok((path, Some(table)))
    }

    fn write_table(&self, key: &str, table: &toml::Table) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let serialized = toml::to_string(table).map_err(|e| StoreError::Format {
            path: path.clone(),
            message: e.to_string(),
        })?;

        fs::create_dir_all(&self.root).map_err(|source| StoreError::Io {
            path: self.root.clone(),
            source,
        })?;
        let io_err = |source: std::io::Error| StoreError::Io {
            path: path.clone(),
            source,
        };
        let mut temp = NamedTempFile::new_in(&self.root).map_err(io_err)?;
        temp.write_all(serialized.as_bytes()).map_err(io_err)?;
        temp.as_file().sync_all().map_err(io_err)?;
        temp.persist(&path).map_err(|e| io_err(e.error))?;

        debug!("Atomically wrote {}", path.display());
        Ok(())
    }
}

fn format_error(path: &Path, message: impl Into<String>) -> StoreError {
    StoreError::Format {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

impl ConfigStore for FileStore {
    fn get_list(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let (path, table) = self.read_table(key)?;
        let Some(value) = table.and_then(|mut t| t.remove(LIST_FIELD)) else {
            return Ok(Vec::new());
        };
        let toml::Value::Array(items) = value else {
            return Err(format_error(&path, "list value is not an array"));
        };
        items
            .into_iter()
            .map(|item| match item {
                toml::Value::String(s) => Ok(s),
                other => Err(format_error(&path, format!("non-string list entry {}", other))),
            })
            .collect()
    }

    fn set_list(&mut self, key: &str, values: &[String]) -> Result<(), StoreError> {
        let mut table = toml::Table::new();
        table.insert(
            LIST_FIELD.to_string(),
            toml::Value::Array(values.iter().cloned().map(toml::Value::String).collect()),
        );
        self.write_table(key, &table)
    }

    fn get_sections(&self, key: &str) -> Result<Sections, StoreError> {
        let (path, table) = self.read_table(key)?;
        let Some(table) = table else {
            return Ok(Vec::new());
        };

        let mut sections = Vec::with_capacity(table.len());
        for (name, value) in table {
            let toml::Value::Table(fields) = value else {
                return Err(format_error(&path, format!("{} is not a section", name)));
            };
            let mut section = Section::new();
            for (field, value) in fields {
                let toml::Value::String(value) = value else {
                    return Err(format_error(&path, format!("{}.{} is not a string", name, field)));
                };
                section.insert(field, value);
            }
            sections.push((name, section));
        }
        Ok(sections)
    }

    fn set_sections(&mut self, key: &str, sections: &Sections) -> Result<(), StoreError> {
        let mut table = toml::Table::new();
        for (name, section) in sections {
            let fields: toml::Table = section
                .iter()
                .map(|(k, v)| (k.clone(), toml::Value::String(v.clone())))
                .collect();
            table.insert(name.clone(), toml::Value::Table(fields));
        }
        self.write_table(key, &table)
    }
}
