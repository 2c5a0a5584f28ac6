//! Display-name translation through text domains.

use log::{debug, warn};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub trait Translator: Send + Sync {
    /// Returns `None` when the domain or message is unknown.
    fn translate(&self, domain: &str, msgid: &str) -> Option<String>;
}

/// Leaves every string untranslated.
pub struct Untranslated;

impl Translator for Untranslated {
    fn translate(&self, _domain: &str, _msgid: &str) -> Option<String> {
        None
    }
}

/// Message catalogs loaded from `<dir>/<domain>.toml` files of `msgid = "msgstr"` pairs.
#[derive(Debug, Default)]
pub struct MessageCatalogs {
    domains: HashMap<String, HashMap<String, String>>,
}

impl MessageCatalogs {
    pub fn load(dir: &Path) -> Self {
        let mut domains = HashMap::new();
        let Ok(read_dir) = fs::read_dir(dir) else {
            debug!("No translations directory at {:?}", dir);
            return Self { domains };
        };

        for entry in read_dir.flatten() {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("toml") {
                continue;
            }
            let Some(domain) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match fs::read_to_string(&path).map_err(anyhow::Error::from).and_then(|content| {
                toml::from_str::<HashMap<String, String>>(&content).map_err(anyhow::Error::from)
            }) {
                Ok(messages) => {
                    debug!("Loaded {} messages for text domain {}", messages.len(), domain);
                    domains.insert(domain.to_string(), messages);
                }
                Err(e) => warn!("Could not load message catalog {:?}: {}", path, e),
            }
        }

        Self { domains }
    }

    #[cfg(test)]
    pub fn insert(&mut self, domain: &str, msgid: &str, msgstr: &str) {
        self.domains
            .entry(domain.to_string())
            .or_default()
            .insert(msgid.to_string(), msgstr.to_string());
    }
}

impl Translator for MessageCatalogs {
    fn translate(&self, domain: &str, msgid: &str) -> Option<String> {
        self.domains.get(domain)?.get(msgid).cloned()
    }
}
