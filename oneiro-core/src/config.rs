//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/oneiro/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/oneiro/` (~/.config/oneiro/)
//! - Data: `$XDG_DATA_HOME/oneiro/` (~/.local/share/oneiro/)
//! - State/Logs: `$XDG_STATE_HOME/oneiro/` (~/.local/state/oneiro/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Journal selection
    #[serde(default)]
    pub journal: JournalConfig,

    /// Listing defaults
    #[serde(default)]
    pub list: ListConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Journal selection configuration
#[derive(Debug, Deserialize)]
pub struct JournalConfig {
    /// Journal used when no `--journal` flag is given
    #[serde(default = "default_journal_name")]
    pub default: String,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            default: default_journal_name(),
        }
    }
}

impl JournalConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.default.trim().is_empty() {
            return Err(Error::Config(
                "journal.default must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_journal_name() -> String {
    "default".to_string()
}

/// Listing defaults
#[derive(Debug, Deserialize)]
pub struct ListConfig {
    /// Page size when `list` is called without `--limit`
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> i64 {
    50
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.journal.validate()?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/oneiro/config.toml` (~/.config/oneiro/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("oneiro").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/oneiro/` (~/.local/share/oneiro/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("oneiro")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/oneiro/` (~/.local/state/oneiro/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("oneiro")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/oneiro/journal.db` (~/.local/share/oneiro/journal.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("journal.db")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/oneiro/oneiro.log` (~/.local/state/oneiro/oneiro.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("oneiro.log")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
