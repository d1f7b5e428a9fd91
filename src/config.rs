//! Configuration for blocstack
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{BlocError, Result};

/// Number of digests collected before a batch is flushed into a bloc
pub const DEFAULT_BATCH_CAPACITY: usize = 100;

/// Topic the manifest address is published on after every flush
pub const DEFAULT_PUBLISH_TOPIC: &str = "head";

/// Main configuration for a blocstack instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for file-backed instances
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── HEAD             (latest manifest pointer)
    ///     └── objects/         (content-addressed blocs and manifests)
    pub data_dir: PathBuf,

    /// Sync strategy: whether object writes are fsynced
    pub sync_strategy: SyncStrategy,

    // -------------------------------------------------------------------------
    // Accumulator Configuration
    // -------------------------------------------------------------------------
    /// Distinct digests held in memory before a flush is triggered
    pub batch_capacity: usize,

    /// Notification topic for manifest addresses
    pub publish_topic: String,
}

/// Object store sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync every object and the directory entry (safest, slowest)
    EveryWrite,

    /// Leave flushing to the OS page cache
    OsBuffered,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./blocstack_data"),
            sync_strategy: SyncStrategy::EveryWrite,
            batch_capacity: DEFAULT_BATCH_CAPACITY,
            publish_topic: DEFAULT_PUBLISH_TOPIC.to_string(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the accumulator cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.batch_capacity == 0 {
            return Err(BlocError::Config(
                "batch_capacity must be greater than zero".to_string(),
            ));
        }
        if self.publish_topic.is_empty() {
            return Err(BlocError::Config(
                "publish_topic must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the object store sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the batch capacity (distinct digests per flush)
    pub fn batch_capacity(mut self, capacity: usize) -> Self {
        self.config.batch_capacity = capacity;
        self
    }

    /// Set the manifest notification topic
    pub fn publish_topic(mut self, topic: impl Into<String>) -> Self {
        self.config.publish_topic = topic.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
