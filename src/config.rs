//! Runtime configuration.
//!
//! Resolution order: built-in defaults, then the TOML file named by
//! `DAY_PLANNER_CONFIG` (if set), then individual environment overrides.

use crate::clock::{ClockConfig, DEFAULT_UTC_OFFSET_MINUTES};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_PATH_VAR: &str = "DAY_PLANNER_CONFIG";
pub const HTTP_ADDR_VAR: &str = "DAY_PLANNER_HTTP_ADDR";
pub const DATABASE_VAR: &str = "DAY_PLANNER_DATABASE";
pub const UTC_OFFSET_VAR: &str = "DAY_PLANNER_UTC_OFFSET";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub http_addr: String,
    /// SQLite file; tasks are kept in memory only when absent.
    pub database_path: Option<PathBuf>,
    pub utc_offset_minutes: i32,
    pub log_filter: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:3000".to_string(),
            database_path: None,
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            log_filter: "day_planner=info".to_string(),
        }
    }
}

impl PlannerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PlannerConfig = toml::from_str(content)?;
        config.clock()?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Defaults, optional file, then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var(CONFIG_PATH_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_toml_file(path.trim())?,
            _ => Self::default(),
        };
        config.apply_overrides(|name| env::var(name).ok())?;
        Ok(config)
    }

    /// Applies overrides from any key/value source (the process environment
    /// in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup(HTTP_ADDR_VAR) {
            self.http_addr = addr;
        }
        if let Some(path) = lookup(DATABASE_VAR) {
            self.database_path = if path.trim().is_empty() {
                None
            } else {
                Some(PathBuf::from(path))
            };
        }
        if let Some(raw) = lookup(UTC_OFFSET_VAR) {
            self.utc_offset_minutes =
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        name: UTC_OFFSET_VAR,
                        value: raw.clone(),
                    })?;
        }
        self.clock()?;
        Ok(())
    }

    pub fn clock(&self) -> Result<ClockConfig, ConfigError> {
        ClockConfig::with_offset_minutes(self.utc_offset_minutes).ok_or_else(|| {
            ConfigError::InvalidValue {
                name: "utc_offset_minutes",
                value: self.utc_offset_minutes.to_string(),
            }
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.http_addr
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                name: "http_addr",
                value: self.http_addr.clone(),
            })
    }
}
