//! Configuration management
//!
//! Storage location, streak calendar offset and advice service settings,
//! persisted as TOML in the platform config directory.

use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::progress::{StoreOptions, DEFAULT_STORAGE_KEY};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Where progress is persisted
    #[serde(default)]
    pub storage: StorageConfig,
    /// Calendar settings for streaks
    #[serde(default)]
    pub streak: StreakConfig,
    /// External advice service
    #[serde(default)]
    pub advice: AdviceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file; defaults to `progress.db` in the data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    /// Key the progress record is stored under
    #[serde(default = "default_storage_key")]
    pub key: String,
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            key: default_storage_key(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreakConfig {
    /// Learner's offset from UTC in minutes, used to decide which day an activity falls on
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl StreakConfig {
    pub fn utc_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .with_context(|| format!("Invalid utc_offset_minutes: {}", self.utc_offset_minutes))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceConfig {
    /// Ask the advice service before falling back to the heuristic
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Gemini generateContent endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Upper bound on one advice call
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

fn default_true() -> bool {
    true
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_output_tokens() -> u32 {
    1024
}

impl Default for AdviceConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            endpoint: default_endpoint(),
            api_key_env: default_api_key_env(),
            timeout_ms: default_timeout_ms(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, writing defaults on first run
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Resolved SQLite database path
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.storage.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("progress.db")),
        }
    }

    /// Progress store settings derived from this config
    pub fn store_options(&self) -> Result<StoreOptions> {
        Ok(StoreOptions {
            key: self.storage.key.clone(),
            utc_offset: self.streak.utc_offset()?,
        })
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "learnpath", "learnpath").context("Failed to get project directories")
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.toml"))
}

/// Get the data directory path
pub fn data_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().to_path_buf())
}

/// Get default configuration as TOML string
pub fn default_config_toml() -> String {
    let config = Config::default();
    toml::to_string_pretty(&config).unwrap_or_else(|_| "# Default configuration\n".to_string())
}
