//! Configuration for QuillKV
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

use crate::error::{Result, StorageError};

/// One day, used for the default retention window
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Main configuration for a QuillKV storage context
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Compaction Configuration
    // -------------------------------------------------------------------------
    /// Values longer than this (in chars) are candidates for compaction
    pub compaction_threshold: usize,

    // -------------------------------------------------------------------------
    // Chunking Configuration
    // -------------------------------------------------------------------------
    /// Size of each chunk segment (in chars)
    pub chunk_size: usize,

    // -------------------------------------------------------------------------
    // Expiration Configuration
    // -------------------------------------------------------------------------
    /// Entries whose `_last_modified` marker is older than this are expired
    pub retention: Duration,

    // -------------------------------------------------------------------------
    // Reporting Configuration
    // -------------------------------------------------------------------------
    /// Assumed store capacity (in chars) used for usage percentages
    pub capacity: usize,

    // -------------------------------------------------------------------------
    // Key Namespace
    // -------------------------------------------------------------------------
    /// Prefix of every reserved key (e.g. `novel_writer_rag_model`)
    pub key_prefix: String,

    /// Module identifiers whose input/output pairs are part of a snapshot
    pub module_ids: Vec<String>,

    // -------------------------------------------------------------------------
    // Journal Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often the file-backed store fsyncs its journal
    pub journal_sync: JournalSync,
}

/// Journal sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalSync {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced records (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compaction_threshold: 1000,
            chunk_size: 50 * 1024,
            retention: DAY * 30,
            capacity: 100 * 1024 * 1024, // 100 MB estimate
            key_prefix: "novel_writer".to_string(),
            module_ids: [
                "module1", "module2", "module2_5", "module3", "module4", "module5", "module6",
                "module7",
            ]
            .iter()
            .map(|id| id.to_string())
            .collect(),
            journal_sync: JournalSync::EveryNEntries { count: 64 },
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Retention window in milliseconds
    pub fn retention_ms(&self) -> i64 {
        i64::try_from(self.retention.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the compaction threshold (in chars)
    pub fn compaction_threshold(mut self, chars: usize) -> Self {
        self.config.compaction_threshold = chars;
        self
    }

    /// Set the chunk segment size (in chars)
    pub fn chunk_size(mut self, chars: usize) -> Self {
        self.config.chunk_size = chars;
        self
    }

    /// Set the retention window
    pub fn retention(mut self, retention: Duration) -> Self {
        self.config.retention = retention;
        self
    }

    /// Set the retention window in whole days (saturating)
    pub fn retention_days(mut self, days: u64) -> Self {
        self.config.retention = Duration::from_secs(days.saturating_mul(DAY.as_secs()));
        self
    }

    /// Set the assumed store capacity (in chars)
    pub fn capacity(mut self, chars: usize) -> Self {
        self.config.capacity = chars;
        self
    }

    /// Set the reserved key prefix
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = prefix.into();
        self
    }

    /// Replace the list of module identifiers
    pub fn module_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.module_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Set the journal sync strategy
    pub fn journal_sync(mut self, strategy: JournalSync) -> Self {
        self.config.journal_sync = strategy;
        self
    }

    pub fn build(self) -> Result<Config> {
        let config = self.config;

        if config.chunk_size == 0 {
            return Err(StorageError::Config("chunk_size must be > 0".to_string()));
        }
        if config.key_prefix.is_empty() {
            return Err(StorageError::Config("key_prefix must not be empty".to_string()));
        }
        if let JournalSync::EveryNEntries { count: 0 } = config.journal_sync {
            return Err(StorageError::Config(
                "journal sync count must be > 0".to_string(),
            ));
        }

        Ok(config)
    }
}
