//! Store Module
//!
//! The underlying synchronous key-value store the optimization layer sits on.
//!
//! ## Responsibilities
//! - Typed string get/set/remove
//! - Stable index-based enumeration for full-store scans
//! - Finite capacity (enforced by the store, not by the engines)
//!
//! ## Implementations
//! - [`MemoryStore`]: `BTreeMap` behind a `RwLock`, for tests and embedding
//! - [`JournalStore`]: same map, made durable by an append-only journal
//!
//! ## Sizes
//! All sizes are counted in chars (Unicode scalar values) of key + value.

mod memory;
mod journal;

pub use memory::MemoryStore;
pub use journal::{JournalOp, JournalRecord, JournalRecovery, JournalStore, RecoveryReport};

use std::collections::BTreeMap;

use crate::error::{Result, StorageError};

/// Synchronous string-keyed store with a finite capacity.
///
/// Enumeration through `key_count`/`key_at` must be stable as long as the
/// store is not mutated. Scans that mutate must snapshot with [`KvStore::keys`]
/// first.
pub trait KvStore {
    /// Read a value. Returns `Ok(None)` if the key does not exist.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Create or overwrite a value.
    ///
    /// Fails with [`StorageError::QuotaExceeded`] if the write would push the
    /// store past its capacity; the store is left unchanged in that case.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a key. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Number of entries currently stored.
    fn key_count(&self) -> Result<usize>;

    /// The key at enumeration position `index`, if any.
    fn key_at(&self, index: usize) -> Result<Option<String>>;

    /// Remove every entry.
    fn clear(&self) -> Result<()>;

    /// Snapshot of all keys in enumeration order.
    ///
    /// Default implementation walks `key_at`. Backends may override for
    /// better performance.
    fn keys(&self) -> Result<Vec<String>> {
        let count = self.key_count()?;
        let mut keys = Vec::with_capacity(count);
        for index in 0..count {
            if let Some(key) = self.key_at(index)? {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    /// Total size of all entries (key + value, in chars).
    fn used(&self) -> Result<usize> {
        let mut used = 0;
        for key in self.keys()? {
            if let Some(value) = self.get(&key)? {
                used += entry_size(&key, &value);
            }
        }
        Ok(used)
    }

    /// Hard capacity in chars, if the store enforces one.
    fn capacity(&self) -> Option<usize> {
        None
    }
}

/// Size of one entry as the store accounts for it
pub fn entry_size(key: &str, value: &str) -> usize {
    key.chars().count() + value.chars().count()
}

/// In-memory map plus its running size, shared by both store implementations
#[derive(Debug, Default)]
pub(crate) struct Entries {
    map: BTreeMap<String, String>,
    used: usize,
}

impl Entries {
    pub(crate) fn get(&self, key: &str) -> Option<&String> {
        self.map.get(key)
    }

    /// Check that replacing `key` with `value` fits within `capacity`
    pub(crate) fn check_quota(&self, key: &str, value: &str, capacity: Option<usize>) -> Result<()> {
        let Some(capacity) = capacity else {
            return Ok(());
        };

        let old = self.map.get(key).map(|v| entry_size(key, v)).unwrap_or(0);
        let needed = self.used - old + entry_size(key, value);
        if needed > capacity {
            return Err(StorageError::QuotaExceeded { needed, capacity });
        }
        Ok(())
    }

    pub(crate) fn insert(&mut self, key: String, value: String) {
        let added = entry_size(&key, &value);
        if let Some(old) = self.map.get(&key) {
            self.used -= entry_size(&key, old);
        }
        self.used += added;
        self.map.insert(key, value);
    }

    pub(crate) fn remove(&mut self, key: &str) {
        if let Some(old) = self.map.remove(key) {
            self.used -= entry_size(key, &old);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.map.clear();
        self.used = 0;
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    pub(crate) fn key_at(&self, index: usize) -> Option<String> {
        self.map.keys().nth(index).cloned()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.map.keys().cloned().collect()
    }

    pub(crate) fn used(&self) -> usize {
        self.used
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.map.iter()
    }
}
