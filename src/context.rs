//! Storage Context
//!
//! Ties a store, its configuration and a clock together, and exposes the
//! key-value facade the rest of the writing tool talks to.
//!
//! ## Write paths
//! - [`StorageContext::set`]: user-visible write, followed by a last-save stamp
//!   unless the key is the last-save key itself
//! - `put_raw`: bookkeeping write that never touches the last-save stamp

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analyzer::Analyzer;
use crate::chunk::ChunkEngine;
use crate::clock::{iso8601, Clock, SystemClock};
use crate::compaction::CompactionEngine;
use crate::config::Config;
use crate::error::Result;
use crate::expiration::ExpirationEngine;
use crate::keys::{self, KeySpace};
use crate::optimizer::Optimizer;
use crate::snapshot::SnapshotProtocol;
use crate::store::KvStore;

/// Input/output pair of one module, as found in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleData {
    /// Parsed JSON input, if present and well-formed
    #[serde(default)]
    pub input: Option<Value>,

    /// Plain-text output, if present
    #[serde(default)]
    pub output: Option<String>,

    #[serde(rename = "hasData", default)]
    pub has_data: bool,
}

/// Raw store usage
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StorageStats {
    pub used: usize,
    pub total: usize,
    pub percentage: f64,
}

impl StorageStats {
    pub(crate) fn new(used: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            0.0
        } else {
            used as f64 / total as f64 * 100.0
        };
        Self { used, total, percentage }
    }
}

/// A store plus everything the engines need to operate on it
///
/// Nothing is cached: every read goes to the store.
pub struct StorageContext<S: KvStore> {
    store: S,
    config: Config,
    keys: KeySpace,
    clock: Arc<dyn Clock>,
}

impl<S: KvStore> StorageContext<S> {
    /// Create a context using the system clock
    pub fn new(store: S, config: Config) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Create a context with an explicit time source
    pub fn with_clock(store: S, config: Config, clock: Arc<dyn Clock>) -> Self {
        let keys = KeySpace::new(config.key_prefix.clone());
        Self {
            store,
            config,
            keys,
            clock,
        }
    }

    // =========================================================================
    // Key-Value Facade
    // =========================================================================

    /// Read a value
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.store.get(key)
    }

    /// Write a value and stamp the last-save time
    ///
    /// Writing the last-save key stores the given value as is.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        if key == self.keys.last_save_time() {
            return self.set_last_save_time(value);
        }
        self.store.set(key, value)?;
        self.touch_last_save()
    }

    /// Overwrite the last-save time without stamping
    pub fn set_last_save_time(&self, value: &str) -> Result<()> {
        self.put_raw(&self.keys.last_save_time(), value)
    }

    /// Delete a value
    pub fn remove(&self, key: &str) -> Result<()> {
        self.store.remove(key)
    }

    /// Read and decode a JSON value
    ///
    /// Missing, empty and malformed values all come back as `Ok(None)`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.get(key)? else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::debug!(key, error = %e, "ignoring undecodable JSON value");
                Ok(None)
            }
        }
    }

    /// Encode a value as JSON and write it
    pub fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw)
    }

    /// Last time any user-visible write happened (RFC 3339)
    pub fn last_save_time(&self) -> Result<Option<String>> {
        self.get(&self.keys.last_save_time())
    }

    /// Delete every entry in the store
    pub fn clear_all(&self) -> Result<()> {
        tracing::info!("clearing all stored data");
        self.store.clear()
    }

    /// All eight provider settings; unset ones map to `""`
    pub fn settings(&self) -> Result<BTreeMap<String, String>> {
        let mut settings = BTreeMap::new();
        for key in self.keys.settings() {
            let value = self.get(&key)?.unwrap_or_default();
            settings.insert(key, value);
        }
        Ok(settings)
    }

    /// Input/output of every configured module that has any data
    pub fn modules_data(&self) -> Result<BTreeMap<String, ModuleData>> {
        let mut modules = BTreeMap::new();
        for module_id in &self.config.module_ids {
            let input = self.load_logical_json(&self.keys.module_input(module_id))?;
            let output = self
                .load_logical(&self.keys.module_output(module_id))?
                .filter(|s| !s.is_empty());

            if input.is_some() || output.is_some() {
                modules.insert(
                    module_id.clone(),
                    ModuleData {
                        input,
                        output,
                        has_data: true,
                    },
                );
            }
        }
        Ok(modules)
    }

    /// True if the user has produced anything worth keeping
    pub fn has_any_data(&self) -> Result<bool> {
        if !self.modules_data()?.is_empty() {
            return Ok(true);
        }
        for key in [
            self.keys.module7_content(),
            self.keys.rag_api_key(),
            self.keys.writing_api_key(),
        ] {
            if self.load_logical(&key)?.is_some_and(|v| !v.is_empty()) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Store usage against its capacity (or the configured estimate)
    pub fn storage_stats(&self) -> Result<StorageStats> {
        let used = self.store.used()?;
        let total = self.store.capacity().unwrap_or(self.config.capacity);
        Ok(StorageStats::new(used, total))
    }

    // =========================================================================
    // Engines
    // =========================================================================

    pub fn chunks(&self) -> ChunkEngine<'_, S> {
        ChunkEngine::new(self)
    }

    pub fn compaction(&self) -> CompactionEngine<'_, S> {
        CompactionEngine::new(self)
    }

    pub fn expiration(&self) -> ExpirationEngine<'_, S> {
        ExpirationEngine::new(self)
    }

    pub fn analyzer(&self) -> Analyzer<'_, S> {
        Analyzer::new(self)
    }

    pub fn snapshots(&self) -> SnapshotProtocol<'_, S> {
        SnapshotProtocol::new(self)
    }

    pub fn optimizer(&self) -> Optimizer<'_, S> {
        Optimizer::new(self)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Give the store back
    pub fn into_store(self) -> S {
        self.store
    }

    // =========================================================================
    // Internal write path (no last-save stamp)
    // =========================================================================

    pub(crate) fn put_raw(&self, key: &str, value: &str) -> Result<()> {
        self.store.set(key, value)
    }

    /// Write the last-save stamp
    pub(crate) fn touch_last_save(&self) -> Result<()> {
        let now = iso8601(self.clock.now());
        self.put_raw(&self.keys.last_save_time(), &now)
    }

    /// Logical value of `key`, whether stored plain or as a chunk family
    pub(crate) fn load_logical(&self, key: &str) -> Result<Option<String>> {
        self.optimizer().smart_load(key)
    }

    /// [`Self::load_logical`] decoded as JSON; malformed content is `None`
    fn load_logical_json(&self, key: &str) -> Result<Option<Value>> {
        let Some(raw) = self.load_logical(key)?.filter(|raw| !raw.is_empty()) else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::debug!(key, error = %e, "ignoring undecodable JSON value");
                Ok(None)
            }
        }
    }

    /// Write `key_last_modified` with the current epoch millis
    pub(crate) fn stamp_modified(&self, key: &str) -> Result<()> {
        let now = self.clock.now_ms().to_string();
        self.put_raw(&keys::last_modified_key(key), &now)
    }

    /// True if `key_compressed` holds the marker
    pub(crate) fn is_compacted(&self, key: &str) -> Result<bool> {
        Ok(self
            .get(&keys::compressed_key(key))?
            .is_some_and(|v| v == keys::COMPRESSED_MARKER))
    }
}
