//! Configuration management.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::models::MAX_SIZE;

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// History storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of entries kept
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    /// SQLite database path (default: <data dir>/kclip/history.db)
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            db_path: default_db_path(),
        }
    }
}

fn default_max_size() -> usize {
    MAX_SIZE
}

fn default_db_path() -> String {
    Config::data_dir()
        .join("history.db")
        .to_string_lossy()
        .to_string()
}

/// Clipboard capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Clipboard poll cadence while the popup is unfocused
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Delay before the extra clipboard read that follows a copy
    #[serde(default = "default_copy_fallback_delay_ms")]
    pub copy_fallback_delay_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            copy_fallback_delay_ms: default_copy_fallback_delay_ms(),
        }
    }
}

impl CaptureConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn copy_fallback_delay(&self) -> Duration {
        Duration::from_millis(self.copy_fallback_delay_ms)
    }
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_copy_fallback_delay_ms() -> u64 {
    100
}

/// Display configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// How long the snackbar stays visible
    #[serde(default = "default_snackbar_ms")]
    pub snackbar_ms: u64,
    /// Characters of each entry shown in the list
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            snackbar_ms: default_snackbar_ms(),
            preview_chars: default_preview_chars(),
        }
    }
}

impl DisplayConfig {
    pub fn snackbar_duration(&self) -> Duration {
        Duration::from_millis(self.snackbar_ms)
    }
}

fn default_snackbar_ms() -> u64 {
    3000
}

fn default_preview_chars() -> usize {
    80
}

impl Config {
    /// Load configuration from default location.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if config_path.exists() {
            Self::from_file(&config_path.to_string_lossy())
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: &str) -> Result<Self> {
        let expanded = expand_path(path);
        let content = std::fs::read_to_string(&expanded)
            .with_context(|| format!("Failed to read config file: {}", expanded))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", expanded))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", expanded))?;
        Ok(config)
    }

    /// Reject values the rest of the program cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.history.max_size == 0 {
            bail!("history.max_size must be at least 1, a history of 0 entries would drop every capture");
        }
        Ok(())
    }

    /// Get the default config path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("kclip")
            .join("config.toml")
    }

    /// Get the data directory for the history database and logs.
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("kclip")
    }

    /// Resolved path of the history database.
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(expand_path(&self.history.db_path))
    }
}

/// Expand ~ to home directory.
fn expand_path(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).to_string_lossy().to_string();
        }
    }
    path.to_string()
}
