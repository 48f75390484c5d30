use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Settings read from the optional TOML config file.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub region: Option<String>,
    pub profile: Option<String>,
    pub age: Option<u32>,
    pub tags: Vec<String>,
    pub request_timeout: Option<String>,
    pub show_properties: Vec<String>,
    pub show_tags: Vec<String>,
}

impl FileConfig {
    pub fn request_timeout(&self) -> Result<Option<humantime::Duration>> {
        self.request_timeout
            .as_deref()
            .map(|s| {
                s.parse::<humantime::Duration>()
                    .context(format!("Invalid 'request-timeout' duration in config: {}", s))
            })
            .transpose()
    }
}

pub fn load(config_path: Option<PathBuf>) -> Result<FileConfig> {
    match config_path {
        Some(path) => read_toml(&path),
        None => Ok(FileConfig::default()),
    }
}

fn read_toml(path: &Path) -> Result<FileConfig> {
    debug!("Reading config file: {}", path.display());
    let content = fs::read_to_string(path)
        .context(format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content).context(format!("Invalid TOML in config file: {}", path.display()))
}
