//! Database configuration.
//!
//! A [`DbConfig`] names the database file, the schema version the registered
//! entities describe, and optionally the directory the file lives in. Raising
//! `version` is what triggers the additive migrator the next time the
//! physical connection is opened.
//!
//! ## Storage
//!
//! Without an explicit directory the database lives in the per-user data
//! directory:
//! - **Windows**: `%LOCALAPPDATA%\lacodda\relorm\`
//! - **macOS**: `~/Library/Application Support/lacodda/relorm/`
//! - **Linux**: `~/.local/share/lacodda/relorm/`
//!
//! ## Usage
//!
//! ```rust
//! use relorm::libs::config::DbConfig;
//!
//! let config = DbConfig::new("notes.db", 2).with_directory("/tmp/relorm-doc");
//! assert!(config.path().ends_with("notes.db"));
//! ```

use super::data_storage::DataStorage;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Name of the optional JSON configuration file in the data directory.
pub const CONFIG_FILE_NAME: &str = "relorm.json";

pub const DEFAULT_DB_NAME: &str = "relorm.db";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    /// Database file name.
    pub name: String,
    /// Schema version described by the registered entities. Starts at 1.
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DB_NAME, 1)
    }
}

impl DbConfig {
    pub fn new(name: &str, version: u32) -> Self {
        Self {
            name: name.to_string(),
            version,
            directory: None,
        }
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Directory holding the database file.
    pub fn directory(&self) -> PathBuf {
        match &self.directory {
            Some(directory) => directory.clone(),
            None => DataStorage::new().base_path().to_path_buf(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.directory().join(&self.name)
    }

    /// Reads a JSON configuration file.
    pub fn read(path: &Path) -> Result<DbConfig> {
        let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        let config: DbConfig = serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Reads `relorm.json` from the data directory, falling back to defaults when absent.
    pub fn read_default() -> Result<DbConfig> {
        let config_file_path = DataStorage::new().get_path(CONFIG_FILE_NAME)?;
        if !config_file_path.exists() {
            return Ok(DbConfig::default());
        }
        Self::read(&config_file_path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let config_file = File::create(path)?;
        serde_json::to_writer_pretty(&config_file, &self)?;
        Ok(())
    }
}
