//! Configuration management for the sync runtime.

use std::env;
use std::time::Duration;

/// Sync runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Delay between automatic sync cycles
    pub sync_interval: Duration,
    /// Maximum rows per push or delete request
    pub batch_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(30),
            batch_limit: 100,
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let sync_interval = match env::var("SYNC_INTERVAL_SECS") {
            Ok(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidInterval)?;
                Duration::from_secs(secs)
            }
            Err(_) => defaults.sync_interval,
        };

        let batch_limit = match env::var("SYNC_BATCH_LIMIT") {
            Ok(raw) => {
                let limit: usize = raw.parse().map_err(|_| ConfigError::InvalidBatchLimit)?;
                if limit == 0 {
                    return Err(ConfigError::InvalidBatchLimit);
                }
                limit
            }
            Err(_) => defaults.batch_limit,
        };

        Ok(Self {
            sync_interval,
            batch_limit,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid SYNC_INTERVAL_SECS value")]
    InvalidInterval,

    #[error("Invalid SYNC_BATCH_LIMIT value, must be a positive integer")]
    InvalidBatchLimit,
}
