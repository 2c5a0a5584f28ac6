use crate::sources::{Discovery, Location, Source};
use anyhow::Result;
use log::{debug, info, warn};
use regex::Regex;
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recursive walk of one descriptor root. Symbolic links are never followed.
#[derive(Debug, Clone)]
pub struct TreeSource {
    root: PathBuf,
    suffix: String,
    canonical_suffix: Option<String>,
    hidden: Vec<Regex>,
}

impl TreeSource {
    pub fn new(root: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            suffix: suffix.into(),
            canonical_suffix: None,
            hidden: Vec::new(),
        }
    }

    /// A `<stem>.<canonical>` file suppresses `<stem>.<suffix>` in the same directory.
    pub fn with_canonical_suffix(mut self, suffix: Option<String>) -> Self {
        self.canonical_suffix = suffix;
        self
    }

    /// File names matching any pattern are left out.
    pub fn with_hidden(mut self, hidden: Vec<Regex>) -> Self {
        self.hidden = hidden;
        self
    }

    fn variant<'a>(&self, path: &'a Path) -> Option<(&'a str, bool)> {
        let ext = path.extension().and_then(OsStr::to_str)?;
        let stem = path.file_stem().and_then(OsStr::to_str)?;
        if ext == self.suffix {
            Some((stem, false))
        } else if self.canonical_suffix.as_deref() == Some(ext) {
            Some((stem, true))
        } else {
            None
        }
    }
}

struct Candidate {
    path: PathBuf,
    stem: String,
    canonical: bool,
}

impl Source for TreeSource {
    fn name(&self) -> &str {
        "tree"
    }

    fn discover(&self) -> Result<Discovery> {
        let mut discovery = Discovery::default();
        if !self.root.exists() {
            debug!("Descriptor root {:?} does not exist, skipping", self.root);
            return Ok(discovery);
        }

        let mut candidates = Vec::new();
        let walker = WalkDir::new(&self.root).follow_links(false).sort_by_file_name();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {:?}: {}", self.root, e);
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                debug!("Visiting directory {:?}", entry.path());
                discovery.directories.push(entry.path().to_path_buf());
                continue;
            }
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let file_name = entry.file_name().to_string_lossy();
            if self.hidden.iter().any(|re| re.is_match(&file_name)) {
                debug!("Hidden descriptor {:?}", path);
                continue;
            }
            if let Some((stem, canonical)) = self.variant(path) {
                candidates.push(Candidate {
                    path: path.to_path_buf(),
                    stem: stem.to_string(),
                    canonical,
                });
            }
        }

        let canonical: HashSet<(PathBuf, String)> = candidates
            .iter()
            .filter(|c| c.canonical)
            .map(|c| (parent_of(&c.path), c.stem.clone()))
            .collect();

        for candidate in candidates {
            if !candidate.canonical && canonical.contains(&(parent_of(&candidate.path), candidate.stem.clone())) {
                debug!("{:?} superseded by its canonical variant", candidate.path);
                continue;
            }
            discovery.locations.push(Location {
                key: format!("{}.{}", candidate.stem, self.suffix),
                path: candidate.path,
            });
        }

        info!(
            "TreeSource: found {} descriptors under {:?}",
            discovery.locations.len(),
            self.root
        );
        Ok(discovery)
    }
}

fn parent_of(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn keys(discovery: &Discovery) -> Vec<String> {
        discovery.locations.iter().map(|l| l.key.clone()).collect()
    }

    #[test]
    fn walks_recursively_and_filters_suffix() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("sub/deeper")).unwrap();
        fs::write(dir.path().join("a.desktop"), "").unwrap();
        fs::write(dir.path().join("sub/deeper/b.desktop"), "").unwrap();
        fs::write(dir.path().join("sub/notes.txt"), "").unwrap();

        let discovery = TreeSource::new(dir.path(), "desktop").discover().unwrap();
        assert_eq!(keys(&discovery), vec!["a.desktop", "b.desktop"]);
        assert_eq!(discovery.directories.len(), 3);
    }

    #[test]
    fn canonical_variant_wins_within_directory() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("other")).unwrap();
        fs::write(dir.path().join("mail.desktop"), "").unwrap();
        fs::write(dir.path().join("mail.w50-desktop"), "").unwrap();
        fs::write(dir.path().join("Mail.desktop"), "").unwrap();
        fs::write(dir.path().join("other/mail.desktop"), "").unwrap();

        let discovery = TreeSource::new(dir.path(), "desktop")
            .with_canonical_suffix(Some("w50-desktop".to_string()))
            .discover()
            .unwrap();

        let found: Vec<(String, String)> = discovery
            .locations
            .iter()
            .map(|l| {
                let rel = l.path.strip_prefix(dir.path()).unwrap().to_string_lossy().to_string();
                (l.key.clone(), rel)
            })
            .collect();
        assert!(found.contains(&("mail.desktop".to_string(), "mail.w50-desktop".to_string())));
        assert!(found.contains(&("Mail.desktop".to_string(), "Mail.desktop".to_string())));
        assert!(found.contains(&("mail.desktop".to_string(), "other/mail.desktop".to_string())));
        assert!(!found.iter().any(|(_, rel)| rel == "mail.desktop"));
        assert_eq!(found.len(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_followed() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("x.desktop"), "").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
        std::os::unix::fs::symlink(outside.path().join("x.desktop"), dir.path().join("y.desktop")).unwrap();

        let discovery = TreeSource::new(dir.path(), "desktop").discover().unwrap();
        assert!(discovery.locations.is_empty());
    }

    #[test]
    fn hidden_names_and_missing_root() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("default.desktop"), "").unwrap();
        fs::write(dir.path().join("beach.desktop"), "").unwrap();

        let discovery = TreeSource::new(dir.path(), "desktop")
            .with_hidden(vec![Regex::new("^default\\.desktop$").unwrap()])
            .discover()
            .unwrap();
        assert_eq!(keys(&discovery), vec!["beach.desktop"]);

        let missing = TreeSource::new(dir.path().join("nope"), "desktop").discover().unwrap();
        assert!(missing.locations.is_empty());
    }
}
