//! Store configuration
//!
//! Configuration loaded from `.lens-store.toml`.

use anyhow::{Context, Result};
use lens_store::EqualityMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where the effective config came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

/// Store configuration loaded from .lens-store.toml
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StoreConfig {
    /// Name used in log output
    #[serde(default = "default_name")]
    pub name: String,

    /// How whole states are compared: "value" or "hash"
    #[serde(default)]
    pub equality: EqualityMode,

    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Number of concurrent dispatcher threads in the demo host
    #[serde(default = "default_dispatchers")]
    pub dispatchers: usize,

    /// Dispatches issued by each dispatcher thread
    #[serde(default = "default_dispatches_per_worker")]
    pub dispatches_per_worker: usize,
}

fn default_name() -> String {
    "lens-store".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_dispatchers() -> usize {
    4
}

fn default_dispatches_per_worker() -> usize {
    1000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            equality: EqualityMode::default(),
            log_level: default_log_level(),
            dispatchers: default_dispatchers(),
            dispatches_per_worker: default_dispatches_per_worker(),
        }
    }
}

impl StoreConfig {
    /// Load config from the first file found, or use defaults if there is none
    ///
    /// A file that exists but does not parse is an error, so the caller can
    /// report it once logging is set up.
    pub fn load() -> Result<(Self, ConfigSource)> {
        match crate::load_config_file() {
            Some((content, path)) => {
                let config = Self::parse(&content, &path)?;
                Ok((config, ConfigSource::File(path)))
            }
            None => Ok((Self::default(), ConfigSource::Defaults)),
        }
    }

    /// Load config from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Save config to a specific path, creating parent directories
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))
    }
}
