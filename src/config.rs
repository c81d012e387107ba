//! Configuration file support.
//!
//! Loads configuration from TOML files. Every field has a default, so an empty or
//! missing file is valid.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the metadata file and the tables directory.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Metadata file name, relative to `data_dir`.
    #[serde(default = "default_metadata_file")]
    pub metadata_file: String,

    /// Directory of table documents, relative to `data_dir`.
    #[serde(default = "default_tables_dir")]
    pub tables_dir: String,

    /// Memoize predicated selects for the life of the process.
    #[serde(default = "default_query_cache")]
    pub query_cache: bool,

    /// REPL history file.
    #[serde(default)]
    pub history_file: Option<PathBuf>,

    /// Maximum REPL history size.
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_metadata_file() -> String {
    "db_meta.json".to_string()
}

fn default_tables_dir() -> String {
    "data".to_string()
}

fn default_query_cache() -> bool {
    true
}

fn default_history_size() -> usize {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            metadata_file: default_metadata_file(),
            tables_dir: default_tables_dir(),
            query_cache: default_query_cache(),
            history_file: None,
            history_size: default_history_size(),
        }
    }
}

impl Config {
    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Saves configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Loads `<config dir>/primdb/config.toml` if it exists, defaults otherwise.
    pub fn load_default() -> Result<Self> {
        match Self::default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Returns the default configuration file path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("primdb").join("config.toml"))
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join(&self.metadata_file)
    }

    pub fn tables_path(&self) -> PathBuf {
        self.data_dir.join(&self.tables_dir)
    }

    /// Configured history file, or `<local data dir>/primdb/history`.
    pub fn history_path(&self) -> Option<PathBuf> {
        self.history_file
            .clone()
            .or_else(|| dirs::data_local_dir().map(|dir| dir.join("primdb").join("history")))
    }
}
