//! Chunk Engine
//!
//! Splits oversized values across a family of keys and reassembles them.
//!
//! ## Layout for key `K`
//! ```text
//! K_chunks      "n"
//! K_compressed  "true"
//! K_chunk_0     segment 0 (compacted if over the threshold)
//! ...
//! K_chunk_n-1   segment n-1
//! ```
//! While `K_chunks` exists, `K` itself holds no value.

use crate::compaction::decompact;
use crate::context::StorageContext;
use crate::error::Result;
use crate::keys;
use crate::store::KvStore;

/// Split `value` into segments of at most `size` chars
///
/// Segment boundaries always fall on char boundaries. Concatenating the
/// segments in order yields `value` again.
pub fn split_chars(value: &str, size: usize) -> Vec<&str> {
    let size = size.max(1);
    let mut segments = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (offset, _) in value.char_indices() {
        if count == size {
            segments.push(&value[start..offset]);
            start = offset;
            count = 0;
        }
        count += 1;
    }
    if count > 0 {
        segments.push(&value[start..]);
    }
    segments
}

/// Chunking over a storage context
pub struct ChunkEngine<'a, S: KvStore> {
    ctx: &'a StorageContext<S>,
}

impl<'a, S: KvStore> ChunkEngine<'a, S> {
    pub(crate) fn new(ctx: &'a StorageContext<S>) -> Self {
        Self { ctx }
    }

    /// Store `value` as a chunk family using the configured chunk size
    pub fn store(&self, key: &str, value: &str) -> Result<usize> {
        self.store_with(key, value, self.ctx.config().chunk_size)
    }

    /// Store `value` as a chunk family of `chunk_size`-char segments
    ///
    /// Returns the number of chunks written. Any previous primary value and
    /// any chunks beyond the new count are removed.
    pub fn store_with(&self, key: &str, value: &str, chunk_size: usize) -> Result<usize> {
        let previous = self.chunk_count(key)?.unwrap_or(0);
        let segments = split_chars(value, chunk_size);
        let compaction = self.ctx.compaction();

        for (index, segment) in segments.iter().enumerate() {
            let stored = compaction.compact_if_large(segment);
            self.ctx.put_raw(&keys::chunk_key(key, index), &stored)?;
        }
        self.ctx
            .put_raw(&keys::chunks_key(key), &segments.len().to_string())?;
        self.ctx
            .put_raw(&keys::compressed_key(key), keys::COMPRESSED_MARKER)?;

        self.ctx.remove(key)?;
        for index in segments.len()..previous {
            self.ctx.remove(&keys::chunk_key(key, index))?;
        }

        tracing::debug!(key, chunks = segments.len(), chunk_size, "stored chunked value");
        Ok(segments.len())
    }

    /// Reassemble a chunked value
    ///
    /// Returns `Ok(None)` if `key` has no chunk family (callers fall back to a
    /// plain read). Missing segments contribute nothing; that loses data
    /// silently, so it is logged.
    pub fn load(&self, key: &str) -> Result<Option<String>> {
        let Some(count) = self.chunk_count(key)? else {
            return Ok(None);
        };
        let compacted = self.ctx.is_compacted(key)?;

        let mut value = String::new();
        for index in 0..count {
            match self.ctx.get(&keys::chunk_key(key, index))? {
                Some(chunk) if compacted => value.push_str(decompact(&chunk)),
                Some(chunk) => value.push_str(&chunk),
                None => tracing::warn!(key, index, count, "missing chunk, treating as empty"),
            }
        }
        Ok(Some(value))
    }

    /// True if `key` currently has a chunk family
    pub fn is_chunked(&self, key: &str) -> Result<bool> {
        Ok(self.ctx.get(&keys::chunks_key(key))?.is_some())
    }

    /// Parsed `key_chunks`
    ///
    /// A malformed count is logged and treated as "no chunk family".
    pub fn chunk_count(&self, key: &str) -> Result<Option<usize>> {
        let Some(raw) = self.ctx.get(&keys::chunks_key(key))? else {
            return Ok(None);
        };
        match raw.trim().parse::<usize>() {
            Ok(count) => Ok(Some(count)),
            Err(_) => {
                tracing::warn!(key, raw = %raw, "malformed chunk count");
                Ok(None)
            }
        }
    }

    /// Delete the chunk family of `key` (count, segments and compaction marker)
    ///
    /// Returns the chars freed by the deleted segments. If the count is
    /// malformed, segments are found by scanning for `key_chunk_<digits>`.
    pub fn remove_family(&self, key: &str) -> Result<usize> {
        let segment_keys = match self.ctx.get(&keys::chunks_key(key))? {
            None => Vec::new(),
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(count) => (0..count).map(|index| keys::chunk_key(key, index)).collect(),
                Err(_) => {
                    tracing::warn!(key, raw = %raw, "malformed chunk count, scanning for segments");
                    self.ctx
                        .store()
                        .keys()?
                        .into_iter()
                        .filter(|candidate| keys::is_chunk_of(candidate, key))
                        .collect()
                }
            },
        };

        let mut freed = 0;
        for chunk_key in segment_keys {
            if let Some(chunk) = self.ctx.get(&chunk_key)? {
                freed += chunk.chars().count();
                self.ctx.remove(&chunk_key)?;
            }
        }
        self.ctx.remove(&keys::chunks_key(key))?;
        self.ctx.remove(&keys::compressed_key(key))?;
        Ok(freed)
    }
}
