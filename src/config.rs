//! Configuration Module
//!
//! Handles loading runtime configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Runtime configuration for the caching layer.
///
/// All values can be configured via environment variables with sensible
/// defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache store can hold
    pub max_entries: usize,
    /// Background expiry sweep interval in seconds
    pub sweep_interval_secs: u64,
    /// Periodic snapshot persistence interval in seconds
    pub snapshot_interval_secs: u64,
    /// Directory for snapshot, bucket and entity files
    pub data_dir: PathBuf,
    /// Base URL of the school administration API
    pub base_url: String,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CLASSCACHE_MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `CLASSCACHE_SWEEP_INTERVAL` - Sweep frequency in seconds (default: 30)
    /// - `CLASSCACHE_SNAPSHOT_INTERVAL` - Snapshot frequency in seconds (default: 60)
    /// - `CLASSCACHE_DATA_DIR` - Data directory (default: platform cache dir)
    /// - `CLASSCACHE_BASE_URL` - API base URL (default: http://localhost:8000/api)
    pub fn from_env() -> Self {
        Self {
            max_entries: env::var("CLASSCACHE_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(crate::cache::DEFAULT_MAX_ENTRIES),
            sweep_interval_secs: env::var("CLASSCACHE_SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            snapshot_interval_secs: env::var("CLASSCACHE_SNAPSHOT_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            data_dir: env::var("CLASSCACHE_DATA_DIR")
                .ok()
                .map(PathBuf::from)
                .unwrap_or_else(default_data_dir),
            base_url: env::var("CLASSCACHE_BASE_URL")
                .ok()
                .unwrap_or_else(|| "http://localhost:8000/api".to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: crate::cache::DEFAULT_MAX_ENTRIES,
            sweep_interval_secs: 30,
            snapshot_interval_secs: 60,
            data_dir: default_data_dir(),
            base_url: "http://localhost:8000/api".to_string(),
        }
    }
}

/// Platform cache directory, falling back to the working directory.
fn default_data_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("classcache")
}
