//! Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote API settings.
    pub api: ApiConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Refresh intervals.
    pub sync: SyncConfig,
}

impl Config {
    /// Load configuration from the default path, falling back to defaults
    /// when no file exists yet.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.api.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.sync.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

/// Remote API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the remote service.
    pub base_url: String,
    /// Page size for catalog endpoints.
    pub page_size: u32,
    /// Page size for the measurement endpoints (server maximum by default).
    pub stream_page_size: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: aeromon_api::DEFAULT_BASE_URL.to_string(),
            page_size: aeromon_api::DEFAULT_PAGE_SIZE,
            stream_page_size: aeromon_api::STREAM_PAGE_SIZE,
        }
    }
}

impl ApiConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.base_url.trim().is_empty() {
            errors.push(ValidationError {
                field: "api.base_url".into(),
                message: "base URL must not be empty".into(),
            });
        }
        if self.page_size == 0 {
            errors.push(ValidationError {
                field: "api.page_size".into(),
                message: "page size must be at least 1".into(),
            });
        }
        if self.stream_page_size == 0 {
            errors.push(ValidationError {
                field: "api.stream_page_size".into(),
                message: "page size must be at least 1".into(),
            });
        }
        errors
    }
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the SQLite database file.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: aeromon_store::default_db_path(),
        }
    }
}

impl StorageConfig {
    fn validate(&self) -> Vec<ValidationError> {
        if self.path.as_os_str().is_empty() {
            vec![ValidationError {
                field: "storage.path".into(),
                message: "database path must not be empty".into(),
            }]
        } else {
            Vec::new()
        }
    }
}

/// Refresh intervals, in seconds. An entity older than its interval is
/// refreshed before it is served.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Station list refresh interval.
    pub station_list_refresh_secs: u64,
    /// Per-station metadata refresh interval.
    pub meta_refresh_secs: u64,
    /// Per-station index refresh interval.
    pub indexes_refresh_secs: u64,
    /// Per-station sensor-catalog refresh interval.
    pub sensors_refresh_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            station_list_refresh_secs: 24 * 60 * 60,
            meta_refresh_secs: 24 * 60 * 60,
            indexes_refresh_secs: 60 * 60,
            sensors_refresh_secs: 24 * 60 * 60,
        }
    }
}

impl SyncConfig {
    pub fn station_list_refresh(&self) -> Duration {
        Duration::seconds(self.station_list_refresh_secs as i64)
    }

    pub fn meta_refresh(&self) -> Duration {
        Duration::seconds(self.meta_refresh_secs as i64)
    }

    pub fn indexes_refresh(&self) -> Duration {
        Duration::seconds(self.indexes_refresh_secs as i64)
    }

    pub fn sensors_refresh(&self) -> Duration {
        Duration::seconds(self.sensors_refresh_secs as i64)
    }

    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for (field, secs) in [
            ("sync.station_list_refresh_secs", self.station_list_refresh_secs),
            ("sync.meta_refresh_secs", self.meta_refresh_secs),
            ("sync.indexes_refresh_secs", self.indexes_refresh_secs),
            ("sync.sensors_refresh_secs", self.sensors_refresh_secs),
        ] {
            if secs == 0 {
                errors.push(ValidationError {
                    field: field.into(),
                    message: "refresh interval must be at least 1 second".into(),
                });
            }
        }
        errors
    }
}

/// A single validation failure.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration: {}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("aeromon")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn default_intervals_match_policy() {
        let sync = SyncConfig::default();
        assert_eq!(sync.station_list_refresh(), Duration::days(1));
        assert_eq!(sync.indexes_refresh(), Duration::hours(1));
        assert_eq!(sync.sensors_refresh(), Duration::days(1));
    }

    #[test]
    fn config_round_trips_through_toml() {
        let mut config = Config::default();
        config.api.base_url = "http://localhost:8080".into();
        config.sync.indexes_refresh_secs = 120;

        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();

        assert_eq!(back.api.base_url, "http://localhost:8080");
        assert_eq!(back.sync.indexes_refresh_secs, 120);
        assert_eq!(back.sync.sensors_refresh_secs, 24 * 60 * 60);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let mut config = Config::default();
        config.api.page_size = 0;

        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert!(errors.iter().any(|e| e.field == "api.page_size"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut config = Config::default();
        config.sync.indexes_refresh_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.sync.meta_refresh_secs = 7200;
        config.save(&path).unwrap();

        let loaded = Config::load_validated(&path).unwrap();
        assert_eq!(loaded.sync.meta_refresh_secs, 7200);
    }
}
