//! Listener configuration.
//!
//! ```toml
//! [listener]
//! threshold_secs = 5
//! log_path = "diff.log"
//! sync_writes = false
//! diagnostics_dir = "logs"
//! ```
//!
//! The file is optional. Lookup order is `$DRIFTWATCH_CONFIG`, then
//! `./driftwatch.toml`, then `~/.driftwatch/config.toml`. Environment
//! overrides are applied on top of whatever was loaded.

use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

use driftwatch_types::Threshold;

pub const CONFIG_ENV: &str = "DRIFTWATCH_CONFIG";
pub const THRESHOLD_ENV: &str = "DRIFTWATCH_THRESHOLD_SECS";
pub const LOG_PATH_ENV: &str = "DRIFTWATCH_LOG_PATH";

pub const DEFAULT_THRESHOLD_SECS: u64 = 5;
pub const DEFAULT_LOG_PATH: &str = "diff.log";
pub const DEFAULT_DIAGNOSTICS_DIR: &str = "logs";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value {value:?} for {var}: {reason}")]
    Env {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    listener: Option<ListenerConfig>,
}

/// Settings fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Skew in seconds above which a delivery is recorded. Default: 5.
    pub threshold_secs: u64,
    /// Anomaly log, relative to the working directory. Default: `diff.log`.
    pub log_path: PathBuf,
    /// fsync after each anomaly append. Default: false.
    pub sync_writes: bool,
    /// Directory for diagnostic logs. Default: `logs`.
    pub diagnostics_dir: PathBuf,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            threshold_secs: DEFAULT_THRESHOLD_SECS,
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            sync_writes: false,
            diagnostics_dir: PathBuf::from(DEFAULT_DIAGNOSTICS_DIR),
        }
    }
}

impl ListenerConfig {
    /// Load from the first config file found, then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match config_path() {
            Some(path) => Self::load_from(&path)?.unwrap_or_default(),
            None => Self::default(),
        };
        config.apply_overrides(|var| env::var(var).ok())?;
        Ok(config)
    }

    /// Load a specific file. A missing file yields `Ok(None)`.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str::<ConfigFile>(&content) {
            Ok(file) => Ok(Some(file.listener.unwrap_or_default())),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    /// Apply `DRIFTWATCH_THRESHOLD_SECS` and `DRIFTWATCH_LOG_PATH` from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(THRESHOLD_ENV) {
            self.threshold_secs = raw.trim().parse().map_err(|err: std::num::ParseIntError| {
                ConfigError::Env {
                    var: THRESHOLD_ENV,
                    value: raw.clone(),
                    reason: err.to_string(),
                }
            })?;
        }

        if let Some(raw) = lookup(LOG_PATH_ENV) {
            if raw.trim().is_empty() {
                return Err(ConfigError::Env {
                    var: LOG_PATH_ENV,
                    value: raw,
                    reason: "path must not be empty".to_string(),
                });
            }
            self.log_path = PathBuf::from(raw);
        }

        Ok(())
    }

    #[must_use]
    pub fn threshold(&self) -> Threshold {
        Threshold::from_secs(self.threshold_secs)
    }
}

/// The config file to read, if any candidate exists.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Ok(explicit) = env::var(CONFIG_ENV)
        && !explicit.trim().is_empty()
    {
        return Some(PathBuf::from(explicit));
    }
    config_path_candidates()
        .into_iter()
        .find(|candidate| candidate.exists())
}

fn config_path_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from("driftwatch.toml")];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".driftwatch").join("config.toml"));
    }
    candidates
}
