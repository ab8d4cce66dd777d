//! Top-level configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use steps_cloud::CloudConfig;
use steps_metrics::MetricsConfig;
use thiserror::Error;

/// Upper bound for one synchronization pass.
pub const DEFAULT_SYNC_TIMEOUT_SECS: u64 = 120;

/// Cadence of the periodic step reading (the platform minimum).
pub const DEFAULT_PERIODIC_INTERVAL_SECS: u64 = 15 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration for the steps core.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StepsConfig {
    /// Ledger database file.
    pub database_path: PathBuf,

    pub cloud: CloudConfig,

    pub metrics: MetricsConfig,

    /// A synchronization pass that takes longer is abandoned.
    pub sync_timeout_secs: u64,

    pub periodic_interval_secs: u64,
}

impl Default for StepsConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("steps.duckdb"),
            cloud: CloudConfig::default(),
            metrics: MetricsConfig::default(),
            sync_timeout_secs: DEFAULT_SYNC_TIMEOUT_SECS,
            periodic_interval_secs: DEFAULT_PERIODIC_INTERVAL_SECS,
        }
    }
}

impl StepsConfig {
    /// Loads a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync_timeout_secs)
    }

    pub fn periodic_interval(&self) -> Duration {
        Duration::from_secs(self.periodic_interval_secs)
    }
}
