//! Persistent settings for the ledger tools.

use std::{
    fs,
    path::PathBuf,
};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::services::SettlementOptions;
use crate::core::validation::SHARE_EPSILON;
use crate::utils::paths::{config_file_in, ensure_dir, resolve_base, write_atomic};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "Config::default_currency")]
    pub currency: String,
    /// Allowed gap between a shared cost and the sum of its custom shares.
    #[serde(default = "Config::default_share_tolerance")]
    pub share_tolerance: f64,
    /// Hours until an approved unlock is stamped to relock. `None` leaves no stamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_relock_hours: Option<u32>,
    #[serde(default)]
    pub include_departed_members: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            currency: Self::default_currency(),
            share_tolerance: Self::default_share_tolerance(),
            auto_relock_hours: None,
            include_departed_members: false,
            data_dir: None,
        }
    }
}

impl Config {
    pub fn default_currency() -> String {
        "BDT".into()
    }

    pub fn default_share_tolerance() -> f64 {
        SHARE_EPSILON
    }

    pub fn auto_relock_after(&self) -> Option<Duration> {
        self.auto_relock_hours
            .filter(|hours| *hours > 0)
            .map(|hours| Duration::hours(i64::from(hours)))
    }

    pub fn settlement_options(&self) -> SettlementOptions {
        SettlementOptions {
            include_departed: self.include_departed_members,
        }
    }
}

/// Loads and saves [`Config`] as JSON.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn with_base_dir(base: Option<PathBuf>) -> Result<Self, ConfigError> {
        let base = resolve_base(base);
        ensure_dir(&base)?;
        Ok(Self::new(config_file_in(&base)))
    }

    /// Returns the stored config, or defaults when nothing has been saved yet.
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&self.path)?;
        serde_json::from_str(&data).map_err(|err| ConfigError::Serde(err.to_string()))
    }

    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(config)
            .map_err(|err| ConfigError::Serde(err.to_string()))?;
        write_atomic(&self.path, &json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_defaults() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_base_dir(Some(temp.path().to_path_buf())).unwrap();
        let config = manager.load().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.share_tolerance, SHARE_EPSILON);
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_base_dir(Some(temp.path().to_path_buf())).unwrap();
        let config = Config {
            auto_relock_hours: Some(2),
            include_departed_members: true,
            ..Config::default()
        };
        manager.save(&config).unwrap();
        let loaded = manager.load().unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.auto_relock_after(), Some(Duration::hours(2)));
        assert!(loaded.settlement_options().include_departed);
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{ "currency": "USD" }"#).unwrap();
        let config = ConfigManager::new(path).load().unwrap();
        assert_eq!(config.currency, "USD");
        assert_eq!(config.auto_relock_after(), None);
    }
}
