//! Optimizer
//!
//! Size-aware save/load on top of the engines, and the one-shot `optimize`
//! pass that reclaims expired data and compacts the rest.

use serde::Serialize;

use crate::analyzer::StorageAnalysis;
use crate::compaction::{decompact, CompactionReport};
use crate::context::{StorageContext, StorageStats};
use crate::error::Result;
use crate::expiration::ReclaimReport;
use crate::keys;
use crate::store::KvStore;

/// Outcome of [`Optimizer::optimize`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizeReport {
    pub before: StorageAnalysis,
    pub reclaimed: ReclaimReport,
    pub compacted: CompactionReport,
    /// Chars freed by reclamation plus chars saved by compaction
    pub saved: usize,
    pub after: StorageAnalysis,
}

/// Usage figures together with the analysis they were derived from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizedStats {
    #[serde(flatten)]
    pub stats: StorageStats,
    pub analysis: StorageAnalysis,
}

pub struct Optimizer<'a, S: KvStore> {
    ctx: &'a StorageContext<S>,
}

impl<'a, S: KvStore> Optimizer<'a, S> {
    pub(crate) fn new(ctx: &'a StorageContext<S>) -> Self {
        Self { ctx }
    }

    /// Save a value, chunking it if it is over the compaction threshold
    ///
    /// Stamps `key_last_modified`. A previous chunk family is replaced, so no
    /// stale segments outlive the rewrite.
    pub fn smart_save(&self, key: &str, value: &str) -> Result<()> {
        if self.ctx.compaction().should_compact(value) {
            self.ctx.chunks().store(key, value)?;
        } else {
            self.ctx.chunks().remove_family(key)?;
            self.ctx.put_raw(key, value)?;
        }
        self.ctx.stamp_modified(key)
    }

    /// Load a logical value, from its chunk family if it has one
    pub fn smart_load(&self, key: &str) -> Result<Option<String>> {
        if let Some(value) = self.ctx.chunks().load(key)? {
            return Ok(Some(value));
        }

        let Some(value) = self.ctx.get(key)? else {
            return Ok(None);
        };
        if self.ctx.is_compacted(key)? {
            return Ok(Some(decompact(&value).to_string()));
        }
        Ok(Some(value))
    }

    /// Reclaim expired data, then compact what is left
    pub fn optimize(&self) -> Result<OptimizeReport> {
        let before = self.ctx.analyzer().analyze()?;
        let reclaimed = self.ctx.expiration().reclaim()?;
        let compacted = self.ctx.compaction().compact_store_wide()?;
        let after = self.ctx.analyzer().analyze()?;

        let saved = reclaimed.freed + compacted.saved;
        tracing::info!(
            reclaimed = reclaimed.reclaimed,
            compacted = compacted.compacted,
            saved,
            "storage optimized"
        );

        Ok(OptimizeReport {
            before,
            reclaimed,
            compacted,
            saved,
            after,
        })
    }

    /// Usage based on the analyzer's total size
    pub fn optimized_stats(&self) -> Result<OptimizedStats> {
        let analysis = self.ctx.analyzer().analyze()?;
        let total = self
            .ctx
            .store()
            .capacity()
            .unwrap_or(self.ctx.config().capacity);

        Ok(OptimizedStats {
            stats: StorageStats::new(analysis.total_size, total),
            analysis,
        })
    }

    /// Drop a logical value together with its whole key family
    pub fn smart_remove(&self, key: &str) -> Result<()> {
        self.ctx.chunks().remove_family(key)?;
        self.ctx.remove(key)?;
        self.ctx.remove(&keys::last_modified_key(key))
    }
}
