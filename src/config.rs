use serde::Deserialize;
use std::path::{Path, PathBuf};
use directories::ProjectDirs;
use anyhow::{Context, Result};
use std::fs;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default = "default_tasks")]
    pub tasks: TreeConfig,
    #[serde(default = "default_bookmarks")]
    pub bookmarks: TreeConfig,
    #[serde(default)]
    pub applets: AppletConfig,
    #[serde(default = "default_backgrounds")]
    pub backgrounds: TreeConfig,
}

#[derive(Deserialize, Debug, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_text_domain")]
    pub text_domain: String,
    #[serde(default)]
    pub translations_dir: Option<PathBuf>,
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
    #[serde(default = "default_browser")]
    pub browser: String,
}

fn default_text_domain() -> String { "hildon-home".to_string() }
fn default_browser() -> String { "xdg-open".to_string() }

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            text_domain: default_text_domain(),
            translations_dir: None,
            store_dir: None,
            browser: default_browser(),
        }
    }
}

/// A domain whose descriptors are found by walking directory trees.
#[derive(Deserialize, Debug, Clone)]
pub struct TreeConfig {
    #[serde(default)]
    pub roots: Vec<PathBuf>,
    #[serde(default = "default_suffix")]
    pub suffix: String,
    #[serde(default)]
    pub canonical_suffix: Option<String>,
    /// Regexes matched against file names; matching descriptors are never offered.
    #[serde(default)]
    pub hidden: Vec<String>,
}

fn default_suffix() -> String { "desktop".to_string() }

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            suffix: default_suffix(),
            canonical_suffix: None,
            hidden: Vec::new(),
        }
    }
}

fn default_tasks() -> TreeConfig {
    TreeConfig {
        roots: vec![PathBuf::from("/usr/share/applications/hildon")],
        canonical_suffix: Some("w50-desktop".to_string()),
        ..TreeConfig::default()
    }
}

fn default_bookmarks() -> TreeConfig {
    let roots = ProjectDirs::from("org", "homeshell", "homeshell")
        .map(|dirs| vec![dirs.data_dir().join("bookmarks")])
        .unwrap_or_default();
    TreeConfig { roots, ..TreeConfig::default() }
}

fn default_backgrounds() -> TreeConfig {
    TreeConfig {
        roots: vec![PathBuf::from("/usr/share/backgrounds")],
        hidden: vec![r"^default\.desktop$".to_string()],
        ..TreeConfig::default()
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppletConfig {
    /// Directories listed one level deep for applet descriptors.
    #[serde(default = "default_applet_dirs")]
    pub dirs: Vec<PathBuf>,
}

fn default_applet_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("/usr/share/applications/hildon-home")]
}

impl Default for AppletConfig {
    fn default() -> Self {
        Self { dirs: default_applet_dirs() }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            tasks: default_tasks(),
            bookmarks: default_bookmarks(),
            applets: AppletConfig::default(),
            backgrounds: default_backgrounds(),
        }
    }
}

impl Config {
    /// Where installed shortcuts are persisted.
    pub fn store_dir(&self) -> PathBuf {
        if let Some(dir) = &self.general.store_dir {
            return dir.clone();
        }
        ProjectDirs::from("org", "homeshell", "homeshell")
            .map(|dirs| dirs.config_dir().join("store"))
            .unwrap_or_else(|| PathBuf::from("store"))
    }

    pub fn translations_dir(&self) -> Option<PathBuf> {
        if self.general.translations_dir.is_some() {
            return self.general.translations_dir.clone();
        }
        ProjectDirs::from("org", "homeshell", "homeshell").map(|dirs| dirs.data_dir().join("translations"))
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => match ProjectDirs::from("org", "homeshell", "homeshell") {
            Some(dirs) => dirs.config_dir().join("config.toml"),
            None => PathBuf::from("config.toml"),
        },
    };

    if !config_path.exists() {
        if path.is_some() {
            anyhow::bail!("config file {:?} does not exist", config_path);
        }
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("reading {:?}", config_path))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("parsing {:?}", config_path))?;
    Ok(config)
}
