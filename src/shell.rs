//! The four registries of the home screen, wired up from configuration.

use crate::config::{Config, TreeConfig};
use crate::descriptor::DescriptorParser;
use crate::descriptor::translate::{MessageCatalogs, Translator, Untranslated};
use crate::model::Domain;
use crate::registry::Registry;
use crate::scan::{ScanJob, ScanOutcome};
use crate::sources::Source;
use crate::sources::plugins::PluginListSource;
use crate::sources::tree::TreeSource;
use crate::store::{ConfigStore, StoreChange};
use crate::tracker::Layout;
use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use std::sync::Arc;

pub const DESKTOP_FILE_FIELD: &str = "X-Desktop-File";

/// Where each domain keeps its installed shortcuts.
pub fn layout(domain: Domain) -> Layout {
    let sections = |key: &str| Layout::Sections {
        key: key.to_string(),
        item_field: DESKTOP_FILE_FIELD.to_string(),
    };
    match domain {
        Domain::Task => Layout::List {
            key: "task-shortcuts".to_string(),
        },
        Domain::Bookmark => sections("bookmark-shortcuts"),
        Domain::Applet => sections("applets"),
        Domain::Background => sections("backgrounds"),
    }
}

fn tree_sources(config: &TreeConfig) -> Result<Vec<Arc<dyn Source>>> {
    let hidden = config
        .hidden
        .iter()
        .map(|pattern| Regex::new(pattern).with_context(|| format!("invalid hidden pattern {:?}", pattern)))
        .collect::<Result<Vec<_>>>()?;

    Ok(config
        .roots
        .iter()
        .map(|root| {
            let source = TreeSource::new(root, config.suffix.clone())
                .with_canonical_suffix(config.canonical_suffix.clone())
                .with_hidden(hidden.clone());
            Arc::new(source) as Arc<dyn Source>
        })
        .collect())
}

pub fn sources(config: &Config, domain: Domain) -> Result<Vec<Arc<dyn Source>>> {
    match domain {
        Domain::Task => tree_sources(&config.tasks),
        Domain::Bookmark => tree_sources(&config.bookmarks),
        Domain::Background => tree_sources(&config.backgrounds),
        Domain::Applet => Ok(vec![Arc::new(PluginListSource::from_dirs(config.applets.dirs.clone()))]),
    }
}

pub struct Shell {
    tasks: Registry,
    bookmarks: Registry,
    applets: Registry,
    backgrounds: Registry,
}

impl Shell {
    /// Builds every registry over clones of `store`. Catalogs start empty.
    pub fn new<S>(config: &Config, store: S) -> Result<Self>
    where
        S: ConfigStore + Clone + 'static,
    {
        let translator: Arc<dyn Translator> = match config.translations_dir() {
            Some(dir) => Arc::new(MessageCatalogs::load(&dir)),
            None => Arc::new(Untranslated),
        };
        let parser = DescriptorParser::new(translator, config.general.text_domain.clone());

        let build = |domain: Domain| -> Result<Registry> {
            Ok(Registry::new(
                domain,
                layout(domain),
                Box::new(store.clone()),
                sources(config, domain)?,
                parser.clone(),
            ))
        };

        Ok(Self {
            tasks: build(Domain::Task)?,
            bookmarks: build(Domain::Bookmark)?,
            applets: build(Domain::Applet)?,
            backgrounds: build(Domain::Background)?,
        })
    }

    pub fn registry(&self, domain: Domain) -> &Registry {
        match domain {
            Domain::Task => &self.tasks,
            Domain::Bookmark => &self.bookmarks,
            Domain::Applet => &self.applets,
            Domain::Background => &self.backgrounds,
        }
    }

    pub fn registry_mut(&mut self, domain: Domain) -> &mut Registry {
        match domain {
            Domain::Task => &mut self.tasks,
            Domain::Bookmark => &mut self.bookmarks,
            Domain::Applet => &mut self.applets,
            Domain::Background => &mut self.backgrounds,
        }
    }

    /// Scans every domain on the calling thread.
    #[cfg(test)]
    pub fn scan_all(&mut self) {
        for domain in Domain::ALL {
            self.registry_mut(domain).scan_now();
        }
    }

    pub fn begin_scan(&mut self, domain: Domain) -> ScanJob {
        self.registry_mut(domain).begin_scan()
    }

    pub fn apply_scan(&mut self, outcome: ScanOutcome) -> bool {
        self.registry_mut(outcome.domain).apply_scan(outcome)
    }

    /// Routes a store notification to the registry owning the key.
    pub fn handle_store_change(&mut self, change: &StoreChange) -> Option<Domain> {
        Domain::ALL
            .into_iter()
            .find(|&domain| self.registry_mut(domain).handle_store_change(change))
    }

    /// The domain whose last scan visited `dir`.
    pub fn domain_for_dir(&self, dir: &Path) -> Option<Domain> {
        Domain::ALL
            .into_iter()
            .find(|&domain| self.registry(domain).watched_dirs().iter().any(|d| d == dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Params;
    use crate::store::memory::MemoryStore;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn config(root: &Path) -> Config {
        let mut config = Config::default();
        config.general.translations_dir = Some(root.join("translations"));
        for (tree, dir) in [
            (&mut config.tasks, "tasks"),
            (&mut config.bookmarks, "bookmarks"),
            (&mut config.backgrounds, "backgrounds"),
        ] {
            fs::create_dir_all(root.join(dir)).unwrap();
            tree.roots = vec![root.join(dir)];
        }
        fs::create_dir_all(root.join("applets")).unwrap();
        config.applets.dirs = vec![root.join("applets")];
        config
    }

    #[test]
    fn layouts_name_the_store_keys() {
        assert_eq!(layout(Domain::Task).key(), "task-shortcuts");
        assert_eq!(layout(Domain::Bookmark).key(), "bookmark-shortcuts");
        assert_eq!(layout(Domain::Applet).key(), "applets");
        assert_eq!(layout(Domain::Background).key(), "backgrounds");
    }

    #[test]
    fn invalid_hidden_pattern_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = config(dir.path());
        config.tasks.hidden = vec!["(".to_string()];
        assert!(Shell::new(&config, MemoryStore::new()).is_err());
    }

    #[test]
    fn domains_are_wired_to_their_sources() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let config = config(root);
        fs::write(
            root.join("tasks/notes.desktop"),
            "[Desktop Entry]\nType=Application\nName=Notes\nExec=notes\n",
        )
        .unwrap();
        fs::write(
            root.join("tasks/notes.w50-desktop"),
            "[Desktop Entry]\nType=Application\nName=Big Notes\nExec=notes\n",
        )
        .unwrap();
        fs::write(
            root.join("backgrounds/default.desktop"),
            "[Desktop Entry]\nType=Background Image\nName=Default\nFile=/a.png\n",
        )
        .unwrap();
        fs::write(
            root.join("backgrounds/sea.desktop"),
            "[Desktop Entry]\nType=Background Image\nName=Sea\nFile=/sea.png\nX-Multiple=true\n",
        )
        .unwrap();
        fs::write(root.join("applets/clock.desktop"), "[Desktop Entry]\nName=Clock\n").unwrap();
        fs::create_dir_all(root.join("translations")).unwrap();
        fs::write(root.join("translations/hildon-home.toml"), "Clock = \"Kello\"\n").unwrap();

        let mut shell = Shell::new(&config, MemoryStore::new()).unwrap();
        shell.scan_all();

        let task = shell.registry(Domain::Task).lookup("notes.desktop").unwrap();
        assert_eq!(task.name, "Big Notes");
        assert!(shell.registry(Domain::Background).lookup("default.desktop").is_none());
        let applet_key = root.join("applets/clock.desktop").to_string_lossy().to_string();
        assert_eq!(shell.registry(Domain::Applet).lookup(&applet_key).unwrap().name, "Kello");
        assert_eq!(shell.domain_for_dir(&root.join("tasks")), Some(Domain::Task));
        assert_eq!(shell.domain_for_dir(&PathBuf::from("/nowhere")), None);
    }

    #[test]
    fn store_changes_reach_the_owning_registry() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());
        fs::write(
            dir.path().join("tasks/notes.desktop"),
            "[Desktop Entry]\nType=Application\nName=Notes\n",
        )
        .unwrap();
        let store = MemoryStore::new();
        let mut shell = Shell::new(&config, store.clone()).unwrap();
        shell.scan_all();

        let mut other = store.clone();
        other.set_list("task-shortcuts", &["notes.desktop".to_string()]).unwrap();
        let change = StoreChange {
            key: "task-shortcuts".to_string(),
        };
        assert_eq!(shell.handle_store_change(&change), Some(Domain::Task));
        assert!(shell.registry(Domain::Task).view().is_empty());

        let unknown = StoreChange {
            key: "something-else".to_string(),
        };
        assert_eq!(shell.handle_store_change(&unknown), None);

        // Installing through one registry leaves the others untouched.
        shell
            .registry_mut(Domain::Task)
            .remove("notes.desktop")
            .unwrap();
        assert!(shell
            .registry_mut(Domain::Task)
            .install("notes.desktop", Params::new())
            .is_ok());
        assert!(shell.registry(Domain::Applet).installed().is_empty());
    }
}
