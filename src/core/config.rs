use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::core::formatter::{Granularity, MAX_RANGE_DAYS};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_format")]
    pub default_format: String,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_format() -> String {
    "text".to_string()
}
fn default_color() -> String {
    "auto".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_format: default_format(),
            color: default_color(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.cloudcost.local".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default = "default_dimension")]
    pub dimension: String,
    #[serde(default = "default_granularity")]
    pub granularity: String,
    #[serde(default = "default_days")]
    pub days: u32,
}

fn default_dimension() -> String {
    "product".to_string()
}
fn default_granularity() -> String {
    "day".to_string()
}
fn default_days() -> u32 {
    30
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
            granularity: default_granularity(),
            days: default_days(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub defaults: Defaults,
}

impl AppConfig {
    /// Get the config file path, respecting XDG_CONFIG_HOME
    pub fn config_path() -> PathBuf {
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("~"))
                    .join(".config")
            });
        config_dir.join("ccost").join("config.toml")
    }

    /// Load config from the default path, falling back to defaults if not found
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Serialize and write this config to the config file path.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Default granularity, if the configured one is known.
    pub fn granularity(&self) -> Option<Granularity> {
        Granularity::from_id(&self.defaults.granularity)
    }

    /// Validate the config
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !["text", "json"].contains(&self.settings.default_format.as_str()) {
            issues.push(format!(
                "Invalid default_format: '{}' (must be 'text' or 'json')",
                self.settings.default_format
            ));
        }
        if !["auto", "always", "never"].contains(&self.settings.color.as_str()) {
            issues.push(format!(
                "Invalid color: '{}' (must be 'auto', 'always', or 'never')",
                self.settings.color
            ));
        }
        if let Err(e) = crate::core::backend::http::validate_endpoint(&self.backend.base_url) {
            issues.push(format!("Invalid base_url: {}", e));
        }
        if self.backend.timeout_secs == 0 {
            issues.push("timeout_secs must be greater than 0".to_string());
        }
        if self.granularity().is_none() {
            issues.push(format!(
                "Invalid granularity: '{}' (must be day|week|month|year)",
                self.defaults.granularity
            ));
        }
        if self.defaults.dimension.trim().is_empty() {
            issues.push("dimension must not be empty".to_string());
        }
        if self.defaults.days == 0 {
            issues.push("days must be greater than 0".to_string());
        } else if self.defaults.days > MAX_RANGE_DAYS {
            issues.push(format!("days must be at most {}", MAX_RANGE_DAYS));
        }
        issues
    }
}
