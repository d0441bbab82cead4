use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub storage: StorageConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Offline event cache and special-date lists.
    pub cache_path: PathBuf,
    /// Server-side store, when this process hosts one.
    pub database_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncConfig {
    /// Shared calendars are polled on this interval; staleness up to one
    /// interval is expected.
    pub poll_interval_minutes: u32,
    pub offline_mode: bool,
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    pub fn load_or_create() -> Result<Self, ConfigError> {
        Self::load_or_create_at(&Self::config_path())
    }

    pub fn load_or_create_at(config_path: &Path) -> Result<Self, ConfigError> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            Self::from_toml(&content)
        } else {
            let config = Self::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("plazo")
            .join("config.toml")
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("plazo");

        Self {
            storage: StorageConfig {
                cache_path: data_dir.join("cache.db"),
                database_path: data_dir.join("server.db"),
            },
            sync: SyncConfig { poll_interval_minutes: 15, offline_mode: false },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_polls_every_15_minutes() {
        let config = Config::default();
        assert_eq!(config.sync.poll_interval_minutes, 15);
    }

    #[test]
    fn default_config_is_online() {
        let config = Config::default();
        assert!(!config.sync.offline_mode);
    }

    #[test]
    fn parse_valid_toml_config() {
        let toml_content = r#"
            [storage]
            cache_path = "/tmp/plazo/cache.db"
            database_path = "/tmp/plazo/server.db"

            [sync]
            poll_interval_minutes = 30
            offline_mode = true
        "#;

        let config = Config::from_toml(toml_content).unwrap();

        assert_eq!(config.storage.cache_path, PathBuf::from("/tmp/plazo/cache.db"));
        assert_eq!(config.sync.poll_interval_minutes, 30);
        assert!(config.sync.offline_mode);
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let invalid_toml = "this is not valid toml";
        let result = Config::from_toml(invalid_toml);
        assert!(result.is_err());
    }

    #[test]
    fn load_or_create_writes_the_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let created = Config::load_or_create_at(&path).unwrap();

        assert!(path.exists());
        let reloaded = Config::load_or_create_at(&path).unwrap();
        assert_eq!(created, reloaded);
    }
}
