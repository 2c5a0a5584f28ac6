use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// The item domains managed by the shell, one registry each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Task,
    Bookmark,
    Applet,
    Background,
}

impl Domain {
    pub const ALL: [Domain; 4] = [Domain::Task, Domain::Bookmark, Domain::Applet, Domain::Background];

    /// Value of the descriptor `Type` key this domain accepts.
    pub fn descriptor_type(self) -> &'static str {
        match self {
            Domain::Task => "Application",
            Domain::Bookmark => "Link",
            Domain::Applet => "default",
            Domain::Background => "Background Image",
        }
    }

    /// Applet descriptors from the plugin catalog often omit `Type`.
    pub fn type_optional(self) -> bool {
        matches!(self, Domain::Applet)
    }

    /// Backgrounds are placed once per home view, so they are multi-instance
    /// unless the descriptor says otherwise.
    pub fn default_multiple(self) -> bool {
        matches!(self, Domain::Background)
    }

    /// Task shortcuts are persisted as bare item keys, which leaves no room
    /// for an instance suffix.
    pub fn single_instance_only(self) -> bool {
        matches!(self, Domain::Task)
    }

    /// The identifier every shortcut of `key` is derived from.
    pub fn shortcut_base(self, key: &str) -> String {
        let name = key.rsplit('/').next().unwrap_or(key);
        match self {
            Domain::Task => key.to_string(),
            Domain::Applet | Domain::Background => name.to_string(),
            Domain::Bookmark => {
                let stem = name.strip_suffix(".desktop").unwrap_or(name);
                sanitize_id(stem)
            }
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Domain::Task => "task",
            Domain::Bookmark => "bookmark",
            Domain::Applet => "applet",
            Domain::Background => "background",
        };
        f.write_str(name)
    }
}

const ID_VALID_CHARS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_+?";
const ID_SUBSTITUTOR: char = '_';

pub fn sanitize_id(raw: &str) -> String {
    raw.chars()
        .map(|c| if ID_VALID_CHARS.contains(c) { c } else { ID_SUBSTITUTOR })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ItemKind {
    Task {
        exec: Option<String>,
        service: Option<String>,
    },
    Bookmark {
        url: String,
        favicon: Option<String>,
    },
    Applet {
        module: Option<String>,
    },
    Background {
        images: Vec<String>,
    },
}

/// One discovered candidate. Replaced wholesale on re-scan, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemRecord {
    pub key: String,           // Stable key derived from the descriptor origin
    pub name: String,          // Translated display name
    pub icon: Option<String>,  // Icon name or path
    pub order: i64,            // Presentation order, 0 when absent
    pub multiple: bool,        // May back several shortcuts at once
    pub source: PathBuf,       // Descriptor the record was parsed from
    pub kind: ItemKind,
}

impl ItemRecord {
    pub fn domain(&self) -> Domain {
        match self.kind {
            ItemKind::Task { .. } => Domain::Task,
            ItemKind::Bookmark { .. } => Domain::Bookmark,
            ItemKind::Applet { .. } => Domain::Applet,
            ItemKind::Background { .. } => Domain::Background,
        }
    }
}

/// Identifies one installed shortcut instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ShortcutId(String);

impl ShortcutId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShortcutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ShortcutId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Instance-specific shortcut parameters, e.g. which view a background belongs to.
pub type Params = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledShortcut {
    pub id: ShortcutId,
    /// Missing when a persisted section does not name its item.
    pub item_key: Option<String>,
    pub params: Params,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortcut_base_per_domain() {
        assert_eq!(Domain::Task.shortcut_base("osso-xterm.desktop"), "osso-xterm.desktop");
        assert_eq!(
            Domain::Applet.shortcut_base("/usr/share/applications/hildon-home/clock.desktop"),
            "clock.desktop"
        );
        assert_eq!(Domain::Bookmark.shortcut_base("maemo org.desktop"), "maemo_org");
    }

    #[test]
    fn instance_policy_per_domain() {
        assert!(Domain::Background.default_multiple());
        assert!(!Domain::Applet.default_multiple());
        assert!(Domain::Task.single_instance_only());
        assert!(!Domain::Background.single_instance_only());
    }

    #[test]
    fn sanitize_replaces_invalid_chars() {
        assert_eq!(sanitize_id("http://a.b/?q=1"), "http___a_b_?q_1");
        assert_eq!(sanitize_id("plain-ID_+"), "plain-ID_+");
    }
}
