//! Application configuration loaded from `parking.toml` plus environment overrides.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//! utc_offset_minutes = 420
//!
//! [repository]
//! type = "local"
//!
//! [dashboard]
//! api_origin = "http://localhost:8080"
//! poll_interval_ms = 3000
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::RepositoryConfig;
use crate::models::{offset_from_minutes, system_offset};

pub const CONFIG_FILE_NAME: &str = "parking.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Facility-local offset from UTC in minutes; the host's offset when unset.
    pub utc_offset_minutes: Option<i32>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            utc_offset_minutes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    pub api_origin: String,
    pub poll_interval_ms: u64,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            api_origin: "http://localhost:8080".to_string(),
            poll_interval_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub dashboard: DashboardSettings,
    #[serde(flatten)]
    pub repository: RepositoryConfig,
}

impl AppConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// First `parking.toml` found in the current directory, `backend/` or the parent.
    pub fn find_default_file() -> Option<PathBuf> {
        [
            PathBuf::from(CONFIG_FILE_NAME),
            PathBuf::from("backend").join(CONFIG_FILE_NAME),
            PathBuf::from("..").join(CONFIG_FILE_NAME),
        ]
        .into_iter()
        .find(|path| path.exists())
    }

    /// Load the default file (if any), apply process environment overrides and validate.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::find_default_file() {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT").and_then(|v| v.trim().parse().ok()) {
            self.server.port = port;
        }
        if let Some(minutes) =
            lookup("PARKING_UTC_OFFSET_MINUTES").and_then(|v| v.trim().parse().ok())
        {
            self.server.utc_offset_minutes = Some(minutes);
        }
        if let Some(origin) = lookup("DASHBOARD_API_ORIGIN") {
            self.dashboard.api_origin = origin;
        }
        if let Some(ms) = lookup("DASHBOARD_POLL_MS").and_then(|v| v.trim().parse().ok()) {
            self.dashboard.poll_interval_ms = ms;
        }
        self.repository.apply_env(&lookup);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(minutes) = self.server.utc_offset_minutes {
            if offset_from_minutes(minutes).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "utc_offset_minutes out of range: {}",
                    minutes
                )));
            }
        }
        if self.dashboard.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "dashboard.poll_interval_ms must be positive".to_string(),
            ));
        }
        self.repository
            .repository_type()
            .map_err(ConfigError::Invalid)?;
        Ok(())
    }

    /// Offset used for day windows and hour-of-day bucketing.
    pub fn utc_offset(&self) -> FixedOffset {
        self.server
            .utc_offset_minutes
            .and_then(offset_from_minutes)
            .unwrap_or_else(system_offset)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
