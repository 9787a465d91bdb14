use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Persisted defaults. Every field can be overridden on the command line.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub adb_path: PathBuf,
    /// Relative paths are resolved against the working directory.
    pub pulled_log: PathBuf,
    pub failed_log: PathBuf,
    pub timeout_secs: u64,
    /// Deadline for one `adb shell ls -R`.
    pub listing_timeout_secs: u64,
    pub max_retries: usize,
    pub retry_backoff_ms: u64,
    /// How often a running pull is checked for exit.
    pub poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            adb_path: PathBuf::from("adb"),
            pulled_log: PathBuf::from("pulled.txt"),
            failed_log: PathBuf::from("failed.txt"),
            timeout_secs: 60,
            listing_timeout_secs: 300,
            max_retries: 0,
            retry_backoff_ms: 500,
            poll_interval_ms: 50,
        }
    }
}

/// `~/.adbpull`, where the default config and verbose logs live.
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".".to_owned() + env!("CARGO_PKG_NAME")))
}

impl Config {
    /// Load from `explicit`, else from `~/.adbpull/config.json`. A missing
    /// default file means defaults; a missing explicit file or a malformed
    /// one is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => match config_dir() {
                Some(d) => d.join("config.json"),
                None => return Ok(Config::default()),
            },
        };
        if !path.exists() {
            if explicit.is_some() {
                return Err(crate::PullError::ConfigInvalid {
                    path: path.display().to_string(),
                    reason: "file not found".to_string(),
                }
                .into());
            }
            return Ok(Config::default());
        }
        Self::read_from(&path)
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let invalid = |reason: String| -> anyhow::Error {
            crate::PullError::ConfigInvalid { path: path.display().to_string(), reason }.into()
        };
        let content = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let cfg = serde_json::from_str::<Config>(&content).map_err(|e| invalid(e.to_string()))?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(cfg)
    }
}
