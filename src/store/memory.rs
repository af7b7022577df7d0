//! In-memory store
//!
//! BTreeMap-based store with RwLock. Data is lost when the store is dropped.

use parking_lot::RwLock;

use crate::error::Result;

use super::{Entries, KvStore};

/// In-memory implementation of [`KvStore`]
///
/// Keys enumerate in sorted order, which keeps `key_at` stable between
/// mutations.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<Entries>,
    capacity: Option<usize>,
}

impl MemoryStore {
    /// Create a new empty store with no capacity limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty store that rejects writes beyond `capacity` chars
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            capacity: Some(capacity),
        }
    }

    /// Build a store pre-populated with entries (no timestamps are written)
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        {
            let mut map = store.entries.write();
            for (key, value) in entries {
                map.insert(key.into(), value.into());
            }
        }
        store
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every entry in key order (for tests and debugging)
    pub fn dump(&self) -> Vec<(String, String)> {
        self.entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write();
        entries.check_quota(key, value, self.capacity)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn key_count(&self) -> Result<usize> {
        Ok(self.entries.read().len())
    }

    fn key_at(&self, index: usize) -> Result<Option<String>> {
        Ok(self.entries.read().key_at(index))
    }

    fn clear(&self) -> Result<()> {
        self.entries.write().clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().keys())
    }

    fn used(&self) -> Result<usize> {
        Ok(self.entries.read().used())
    }

    fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}
