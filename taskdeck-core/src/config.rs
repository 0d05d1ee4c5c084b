//! Backend and sync settings at `~/.taskdeck/config.yaml`.
//!
//! Every field has a default, so a missing or partial file is valid.
//! `TASKDECK_BACKEND_URL` and `TASKDECK_API_KEY` override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::{ensure_private_dir, read_yaml, taskdeck_root, write_yaml_atomic};

pub const ENV_BACKEND_URL: &str = "TASKDECK_BACKEND_URL";
pub const ENV_API_KEY: &str = "TASKDECK_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub sync: SyncSettings,
}

/// Where the backend lives and the project key sent with every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: String,
}

/// Scheduler cadence, timeouts, and retry policy for the profile sync job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub interval_secs: u64,
    /// Per-request timeout at the HTTP boundary.
    pub call_timeout_secs: u64,
    /// Deadline for one whole run.
    pub job_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval_secs: 15 * 60,
            call_timeout_secs: 15,
            job_timeout_secs: 60,
            max_retries: 5,
            retry_base_delay_ms: 2_000,
            retry_max_delay_secs: 5 * 60,
        }
    }
}

impl SyncSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs.max(1))
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs.max(1))
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_secs(self.retry_max_delay_secs)
    }
}

impl BackendConfig {
    /// Base URL without a trailing slash; error if unset.
    pub fn base_url(&self) -> Result<&str, StoreError> {
        let url = self.base_url.trim().trim_end_matches('/');
        if url.is_empty() {
            return Err(StoreError::MissingSetting {
                key: "backend.base_url",
                env: ENV_BACKEND_URL,
            });
        }
        Ok(url)
    }

    pub fn api_key(&self) -> Result<&str, StoreError> {
        let key = self.api_key.trim();
        if key.is_empty() {
            return Err(StoreError::MissingSetting {
                key: "backend.api_key",
                env: ENV_API_KEY,
            });
        }
        Ok(key)
    }
}

impl Config {
    /// Apply environment overrides through `lookup` (normally `std::env::var`).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BACKEND_URL).filter(|v| !v.trim().is_empty()) {
            self.backend.base_url = url;
        }
        if let Some(key) = lookup(ENV_API_KEY).filter(|v| !v.trim().is_empty()) {
            self.backend.api_key = key;
        }
    }
}

/// `<home>/.taskdeck/config.yaml`
pub fn config_path_at(home: &Path) -> PathBuf {
    taskdeck_root(home).join("config.yaml")
}

/// Load the file (defaults if absent) without environment overrides.
pub fn load_file_at(home: &Path) -> Result<Config, StoreError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(Config::default());
    }
    read_yaml(&path)
}

/// Load the effective configuration: file, then environment overrides.
pub fn load_at(home: &Path) -> Result<Config, StoreError> {
    let mut config = load_file_at(home)?;
    config.apply_overrides(|key| std::env::var(key).ok());
    Ok(config)
}

/// Atomically write the configuration file.
pub fn save_at(home: &Path, config: &Config) -> Result<(), StoreError> {
    ensure_private_dir(&taskdeck_root(home))?;
    write_yaml_atomic(&config_path_at(home), config)
}
