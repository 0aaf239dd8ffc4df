use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::services::sleeper::SLEEPER_BASE_URL;

pub const CONFIG_PATH_ENV: &str = "DYNASTY_DRAFT_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "dynasty-draft.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value for `{field}`: {message}")]
    Invalid { field: &'static str, message: String },
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    pub max_connections: u32,
    pub sleeper_base_url: String,
    pub request_timeout_secs: u64,
    pub cache_max_age_hours: i64,
    pub refresh_interval_hours: u64,
    pub values_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            database_url: "sqlite://./data/dynasty.db".to_string(),
            max_connections: 5,
            sleeper_base_url: SLEEPER_BASE_URL.to_string(),
            request_timeout_secs: 10,
            cache_max_age_hours: 24,
            refresh_interval_hours: 24,
            values_path: PathBuf::from("data/dynasty_values.json"),
        }
    }
}

impl Config {
    /// Reads the config file (defaults when absent), then applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file(Path::new(&path))?;

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Ok(addr) = std::env::var("BIND_ADDR") {
            config.bind_addr = addr;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("max_connections", self.max_connections as i64),
            ("request_timeout_secs", self.request_timeout_secs as i64),
            ("cache_max_age_hours", self.cache_max_age_hours),
            ("refresh_interval_hours", self.refresh_interval_hours as i64),
        ];
        for (field, value) in positive {
            if value <= 0 {
                return Err(ConfigError::Invalid {
                    field,
                    message: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cache_max_age(&self) -> chrono::Duration {
        chrono::Duration::hours(self.cache_max_age_hours)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_hours * 60 * 60)
    }
}
