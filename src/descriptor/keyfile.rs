//! Group/key-value descriptor files (`[Group]` headers, `Key=Value` lines).

use crate::error::DescriptorError;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct KeyFile {
    groups: HashMap<String, HashMap<String, String>>,
}

impl KeyFile {
    pub fn parse(content: &str) -> Result<Self, DescriptorError> {
        let mut groups: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current: Option<String> = None;

        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') {
                let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) else {
                    return Err(syntax(index, "unterminated group header"));
                };
                if name.is_empty() {
                    return Err(syntax(index, "empty group name"));
                }
                groups.entry(name.to_string()).or_default();
                current = Some(name.to_string());
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(syntax(index, "expected key=value"));
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(syntax(index, "empty key"));
            }
            let Some(group) = &current else {
                return Err(syntax(index, "key outside of any group"));
            };

            groups
                .entry(group.clone())
                .or_default()
                .insert(key.to_string(), unescape(value.trim_start()));
        }

        Ok(Self { groups })
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    pub fn get_string(&self, group: &str, key: &str) -> Option<&str> {
        self.groups.get(group)?.get(key).map(String::as_str)
    }

    /// Absent keys yield `default`; present but non-numeric values are rejected.
    pub fn get_integer(&self, group: &str, key: &str, default: i64) -> Result<i64, DescriptorError> {
        match self.get_string(group, key) {
            None => Ok(default),
            Some(value) => value.trim().parse().map_err(|_| DescriptorError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
    }

    pub fn get_bool(&self, group: &str, key: &str, default: bool) -> Result<bool, DescriptorError> {
        match self.get_string(group, key).map(str::trim) {
            None => Ok(default),
            Some("true") | Some("1") => Ok(true),
            Some("false") | Some("0") => Ok(false),
            Some(value) => Err(DescriptorError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
    }
}

fn syntax(index: usize, message: &str) -> DescriptorError {
    DescriptorError::Syntax {
        line: index + 1,
        message: message.to_string(),
    }
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('s') => out.push(' '),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# comment
[Desktop Entry]
Type=Application
Name = Notes
Comment=Line\\sone\\nTwo
X-Order=3
X-Multiple=true

[Other]
Name=Ignored
";

    #[test]
    fn parses_groups_and_typed_values() {
        let kf = KeyFile::parse(SAMPLE).unwrap();
        assert!(kf.has_group("Desktop Entry"));
        assert_eq!(kf.get_string("Desktop Entry", "Name"), Some("Notes"));
        assert_eq!(kf.get_string("Desktop Entry", "Comment"), Some("Line one\nTwo"));
        assert_eq!(kf.get_integer("Desktop Entry", "X-Order", 0).unwrap(), 3);
        assert!(kf.get_bool("Desktop Entry", "X-Multiple", false).unwrap());
        assert_eq!(kf.get_string("Other", "Name"), Some("Ignored"));
    }

    #[test]
    fn absent_keys_use_defaults() {
        let kf = KeyFile::parse("[Desktop Entry]\nName=x\n").unwrap();
        assert_eq!(kf.get_integer("Desktop Entry", "X-Order", 0).unwrap(), 0);
        assert!(!kf.get_bool("Desktop Entry", "X-Multiple", false).unwrap());
        assert_eq!(kf.get_string("Missing", "Name"), None);
    }

    #[test]
    fn rejects_bad_values_and_lines() {
        let kf = KeyFile::parse("[Desktop Entry]\nX-Order=first\nX-Multiple=maybe\n").unwrap();
        assert!(matches!(
            kf.get_integer("Desktop Entry", "X-Order", 0),
            Err(DescriptorError::InvalidValue { .. })
        ));
        assert!(kf.get_bool("Desktop Entry", "X-Multiple", false).is_err());

        assert!(matches!(
            KeyFile::parse("Name=orphan\n"),
            Err(DescriptorError::Syntax { line: 1, .. })
        ));
        assert!(matches!(
            KeyFile::parse("[Desktop Entry]\njust words\n"),
            Err(DescriptorError::Syntax { line: 2, .. })
        ));
    }
}
