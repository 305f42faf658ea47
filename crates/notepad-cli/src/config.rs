use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NotepadConfig {
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub display: DisplaySection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySection {
    pub sort: String,
    pub show_private: bool,
    pub unfiled_name: Option<String>,
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            sort: "modified desc".to_string(),
            show_private: false,
            unfiled_name: None,
        }
    }
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_config_dir()?.join("config.toml"))
}

pub fn default_database_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_data_dir()?.join("notepad.db"))
}

/// Load the config file, falling back to defaults when it does not exist.
pub fn load_config(path: &Path) -> anyhow::Result<NotepadConfig> {
    if !path.exists() {
        return Ok(NotepadConfig::default());
    }
    read_config(path)
}

pub fn read_config(path: &Path) -> anyhow::Result<NotepadConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
    toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))
}

/// Database location: flag or `NOTEPAD_DB`, then config, then the XDG default.
pub fn resolve_database_path(
    flag: Option<&str>,
    config: &NotepadConfig,
) -> anyhow::Result<PathBuf> {
    if let Some(path) = flag.filter(|p| !p.trim().is_empty()) {
        return expand_home(path);
    }
    if let Some(path) = config.database.path.as_deref() {
        return expand_home(path);
    }
    default_database_path()
}

fn expand_home(path: &str) -> anyhow::Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => Ok(home_dir()?.join(rest)),
        None => Ok(PathBuf::from(path)),
    }
}

pub fn xdg_config_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_CONFIG_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("notepad"));
        }
    }
    Ok(home_dir()?.join(".config").join("notepad"))
}

pub fn xdg_data_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_DATA_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("notepad"));
        }
    }
    Ok(home_dir()?.join(".local").join("share").join("notepad"))
}

fn home_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| anyhow::anyhow!("HOME is not set; cannot resolve default paths"))?;
    Ok(PathBuf::from(home))
}
