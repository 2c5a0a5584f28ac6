//! Typed decoding of item descriptors.

pub mod keyfile;
pub mod translate;

use crate::error::DescriptorError;
use crate::model::{Domain, ItemKind, ItemRecord};
use keyfile::KeyFile;
use log::debug;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use translate::Translator;

pub const DESKTOP_GROUP: &str = "Desktop Entry";

const KEY_TYPE: &str = "Type";
const KEY_NAME: &str = "Name";
const KEY_ICON: &str = "Icon";
const KEY_EXEC: &str = "Exec";
const KEY_URL: &str = "URL";
const KEY_FAVICON: &str = "X-Favicon";
const KEY_FILE: &str = "File";
const KEY_SERVICE: &str = "X-Osso-Service";
const KEY_TEXT_DOMAIN: &str = "X-Text-Domain";
const KEY_MULTIPLE: &str = "X-Multiple";
const KEY_ORDER: &str = "X-Order";
const KEY_MODULE: &str = "X-Path";
const KEY_EXTRA_FILES: [&str; 4] = ["X-File1", "X-File2", "X-File3", "X-File4"];

/// Turns descriptor content into an [`ItemRecord`]. Cheap to clone into scan threads.
#[derive(Clone)]
pub struct DescriptorParser {
    translator: Arc<dyn Translator>,
    default_text_domain: String,
}

impl DescriptorParser {
    pub fn new(translator: Arc<dyn Translator>, default_text_domain: impl Into<String>) -> Self {
        Self {
            translator,
            default_text_domain: default_text_domain.into(),
        }
    }

    pub fn parse_file(&self, domain: Domain, key: &str, path: &Path) -> Result<ItemRecord, DescriptorError> {
        let content = fs::read_to_string(path).map_err(|source| DescriptorError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse(domain, key, path, &content)
    }

    pub fn parse(
        &self,
        domain: Domain,
        key: &str,
        source: &Path,
        content: &str,
    ) -> Result<ItemRecord, DescriptorError> {
        let kf = KeyFile::parse(content)?;
        if !kf.has_group(DESKTOP_GROUP) {
            return Err(DescriptorError::MissingRequiredField("[Desktop Entry]"));
        }
        let get = |k: &str| kf.get_string(DESKTOP_GROUP, k).filter(|v| !v.is_empty());

        match get(KEY_TYPE) {
            Some(declared) if declared == domain.descriptor_type() => {}
            None if domain.type_optional() => {}
            declared => {
                return Err(DescriptorError::NotApplicable {
                    declared: declared.map(str::to_string),
                });
            }
        }

        let raw_name = get(KEY_NAME).ok_or(DescriptorError::MissingRequiredField(KEY_NAME))?;
        let text_domain = get(KEY_TEXT_DOMAIN).unwrap_or(self.default_text_domain.as_str());
        let name = self
            .translator
            .translate(text_domain, raw_name)
            .unwrap_or_else(|| raw_name.to_string());

        let order = kf.get_integer(DESKTOP_GROUP, KEY_ORDER, 0)?;
        let mut multiple = kf.get_bool(DESKTOP_GROUP, KEY_MULTIPLE, domain.default_multiple())?;
        if multiple && domain.single_instance_only() {
            debug!("{} ignored for {} descriptor {}", KEY_MULTIPLE, domain, key);
            multiple = false;
        }
        let icon = get(KEY_ICON).map(str::to_string);

        let kind = match domain {
            Domain::Task => ItemKind::Task {
                exec: get(KEY_EXEC).map(str::to_string),
                service: get(KEY_SERVICE).map(str::to_string),
            },
            Domain::Bookmark => ItemKind::Bookmark {
                url: get(KEY_URL)
                    .ok_or(DescriptorError::MissingRequiredField(KEY_URL))?
                    .to_string(),
                favicon: get(KEY_FAVICON).map(str::to_string),
            },
            Domain::Applet => ItemKind::Applet {
                module: get(KEY_MODULE).map(str::to_string),
            },
            Domain::Background => {
                let images: Vec<String> = std::iter::once(KEY_FILE)
                    .chain(KEY_EXTRA_FILES)
                    .filter_map(|k| get(k).map(str::to_string))
                    .collect();
                if images.is_empty() {
                    return Err(DescriptorError::MissingRequiredField(KEY_FILE));
                }
                ItemKind::Background { images }
            }
        };

        Ok(ItemRecord {
            key: key.to_string(),
            name,
            icon,
            order,
            multiple,
            source: source.to_path_buf(),
            kind,
        })
    }
}
