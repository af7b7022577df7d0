//! Compaction Engine
//!
//! Shrinks prose-like values by normalizing whitespace.
//!
//! The transform is lossy with respect to exact whitespace, and there is no
//! inverse: once a value is compacted, the compacted text is canonical.
//! `decompact` is the identity and exists so read paths stay symmetrical.

use std::borrow::Cow;

use serde::Serialize;

use crate::context::StorageContext;
use crate::error::Result;
use crate::keys;
use crate::store::KvStore;

/// Collapse every whitespace run to one space and trim the ends
///
/// Line structure does not survive: newlines are whitespace too, so leading
/// and trailing blanks per line and blank lines all disappear with them.
/// See [`is_collapsible`] for what counts as whitespace.
pub fn compact(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for word in value.split(is_collapsible).filter(|word| !word.is_empty()) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Whitespace as the browser regex `\s` sees it
///
/// Unicode `White_Space`, minus NEL (U+0085), plus the BOM (U+FEFF).
pub fn is_collapsible(c: char) -> bool {
    match c {
        '\u{85}' => false,
        '\u{FEFF}' => true,
        c => c.is_whitespace(),
    }
}

/// Inverse of [`compact`] for rendering purposes (identity)
pub fn decompact(value: &str) -> &str {
    value
}

/// Outcome of a store-wide compaction pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompactionReport {
    /// Entries rewritten in compacted form
    pub compacted: usize,

    /// Chars saved across those entries
    pub saved: usize,

    /// Keys that faulted and were left alone
    pub skipped: usize,
}

/// Compaction over a storage context
pub struct CompactionEngine<'a, S: KvStore> {
    ctx: &'a StorageContext<S>,
}

impl<'a, S: KvStore> CompactionEngine<'a, S> {
    pub(crate) fn new(ctx: &'a StorageContext<S>) -> Self {
        Self { ctx }
    }

    /// True iff `value` is longer than the compaction threshold
    pub fn should_compact(&self, value: &str) -> bool {
        value.chars().count() > self.ctx.config().compaction_threshold
    }

    /// Compact `value` unless it is shorter than the threshold
    ///
    /// Used for chunk segments, where short tails stay untouched. A segment of
    /// exactly the threshold length is compacted.
    pub fn compact_if_large<'v>(&self, value: &'v str) -> Cow<'v, str> {
        if value.chars().count() >= self.ctx.config().compaction_threshold {
            Cow::Owned(compact(value))
        } else {
            Cow::Borrowed(value)
        }
    }

    /// Compact every eligible entry in the store
    ///
    /// An entry is eligible if it holds a logical value (not metadata), is
    /// over the threshold, is not already marked compacted, and compaction
    /// makes it strictly shorter. Results that still exceed the chunk size are
    /// moved into a chunk family. A second pass performs no writes.
    pub fn compact_store_wide(&self) -> Result<CompactionReport> {
        let mut report = CompactionReport::default();

        // Snapshot keys first: compaction writes metadata keys as it goes
        for key in self.ctx.store().keys()? {
            if keys::is_metadata_key(&key) {
                continue;
            }

            match self.compact_key(&key) {
                Ok(Some(saved)) => {
                    report.compacted += 1;
                    report.saved += saved;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "compaction failed for key, skipping");
                    report.skipped += 1;
                }
            }
        }

        tracing::info!(
            compacted = report.compacted,
            saved = report.saved,
            skipped = report.skipped,
            "store-wide compaction finished"
        );
        Ok(report)
    }

    /// Compact one key; returns chars saved, or `None` if nothing was written
    fn compact_key(&self, key: &str) -> Result<Option<usize>> {
        let Some(value) = self.ctx.get(key)? else {
            return Ok(None);
        };
        if !self.should_compact(&value) || self.ctx.is_compacted(key)? {
            return Ok(None);
        }

        let compacted = compact(&value);
        let before = value.chars().count();
        let after = compacted.chars().count();
        if after >= before {
            return Ok(None);
        }

        if after > self.ctx.config().chunk_size {
            self.ctx.chunks().store(key, &compacted)?;
            tracing::debug!(key, before, after, "compacted into chunks");
        } else {
            self.ctx.put_raw(key, &compacted)?;
            if let Err(e) = self
                .ctx
                .put_raw(&keys::compressed_key(key), keys::COMPRESSED_MARKER)
            {
                // Restore the original value
                self.ctx.put_raw(key, &value)?;
                return Err(e);
            }
            tracing::debug!(key, before, after, "compacted in place");
        }
        self.ctx.stamp_modified(key)?;

        Ok(Some(before - after))
    }
}
