//! Configuration for jsonkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

/// Main configuration shared by every store of a registry
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for store documents without an explicit file path
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── {store}.json        (document)
    ///     └── {store}.json.dump   (corruption dumps, append-only)
    pub data_dir: PathBuf,

    /// fsync the temp file before renaming it over the document
    pub sync_on_write: bool,

    // -------------------------------------------------------------------------
    // Expiry Sweep Configuration
    // -------------------------------------------------------------------------
    /// Delay between two sweeps
    pub sweep_interval: Duration,

    /// Integer column holding the expiry timestamp (unix seconds)
    pub expiry_column: String,

    // -------------------------------------------------------------------------
    // Shares Configuration
    // -------------------------------------------------------------------------
    /// Live shares one owner may hold at once
    pub max_shares_per_owner: usize,

    /// Largest single upload in bytes
    pub max_transfer_size: u64,

    /// Total bytes all live shares may occupy
    pub max_data_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            sync_on_write: true,
            sweep_interval: Duration::from_secs(3600),
            expiry_column: "date_expire".to_string(),
            max_shares_per_owner: 5,
            max_transfer_size: 150 * 1024 * 1024,
            max_data_size: 1024 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for store documents)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Enable or disable fsync before the atomic rename
    pub fn sync_on_write(mut self, sync: bool) -> Self {
        self.config.sync_on_write = sync;
        self
    }

    /// Set the delay between expiry sweeps
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Set the expiry column name
    pub fn expiry_column(mut self, column: impl Into<String>) -> Self {
        self.config.expiry_column = column.into();
        self
    }

    /// Set the per-owner share quota
    pub fn max_shares_per_owner(mut self, max: usize) -> Self {
        self.config.max_shares_per_owner = max;
        self
    }

    /// Set the largest accepted upload (bytes)
    pub fn max_transfer_size(mut self, bytes: u64) -> Self {
        self.config.max_transfer_size = bytes;
        self
    }

    /// Set the total storage budget for shares (bytes)
    pub fn max_data_size(mut self, bytes: u64) -> Self {
        self.config.max_data_size = bytes;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
