//! Configuration manager for loading and saving application configuration
//!
//! This module resolves the Nymgraph data directory and loads/saves
//! `config.json` inside it with atomic writes to prevent corruption.

use crate::config::models::AppConfig;
use crate::error::{NymgraphError, Result, StringError};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable that overrides the data directory
pub const HOME_ENV: &str = "NYMGRAPH_HOME";

/// Configuration manager
pub struct ConfigManager;

impl ConfigManager {
    /// Get the Nymgraph data directory
    ///
    /// Resolution order: `$NYMGRAPH_HOME`, `%APPDATA%\Nymgraph` (Windows),
    /// `$XDG_CONFIG_HOME/nymgraph`, `$HOME/.config/nymgraph`, `./nymgraph`.
    pub fn data_dir() -> PathBuf {
        if let Ok(home) = std::env::var(HOME_ENV) {
            return PathBuf::from(home);
        }

        #[cfg(windows)]
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("Nymgraph");
        }

        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("nymgraph");
        }

        match std::env::var("HOME") {
            Ok(home) => PathBuf::from(home).join(".config").join("nymgraph"),
            Err(_) => PathBuf::from(".").join("nymgraph"),
        }
    }

    /// Get the path to the configuration file
    pub fn get_config_path() -> PathBuf {
        Self::data_dir().join("config.json")
    }

    /// Ensure the data directory exists
    pub fn ensure_config_dir() -> Result<PathBuf> {
        let dir = Self::data_dir();
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Load configuration from disk
    ///
    /// If the configuration file doesn't exist or is corrupt, returns default configuration.
    pub fn load() -> Result<AppConfig> {
        Self::load_from(&Self::get_config_path())
    }

    /// Load configuration from an explicit path
    pub fn load_from(config_path: &Path) -> Result<AppConfig> {
        if !config_path.exists() {
            info!("Configuration file not found, using defaults");
            return Ok(AppConfig::default());
        }

        let json = std::fs::read_to_string(config_path)?;

        match serde_json::from_str(&json) {
            Ok(config) => {
                info!("Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                warn!("Failed to parse configuration, using defaults: {}", e);
                Ok(AppConfig::default())
            }
        }
    }

    /// Save configuration to disk with atomic write
    pub fn save(config: &AppConfig) -> Result<()> {
        Self::ensure_config_dir()?;
        Self::save_to(&Self::get_config_path(), config)
    }

    /// Save configuration to an explicit path
    ///
    /// Uses a temporary file and rename to ensure atomic write operation.
    pub fn save_to(config_path: &Path, config: &AppConfig) -> Result<()> {
        let config_dir = config_path.parent().ok_or_else(|| {
            NymgraphError::ConfigError(StringError::new("Invalid config path"))
        })?;

        let temp_path = config_dir.join("config.json.tmp");
        let json = serde_json::to_string_pretty(config)?;
        std::fs::write(&temp_path, json)?;
        std::fs::rename(temp_path, config_path)?;

        info!("Configuration saved successfully");
        Ok(())
    }
}
