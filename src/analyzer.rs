//! Analyzer
//!
//! One read-only pass over the store producing usage figures for reporting.
//! Savings are estimated by running [`compact`] speculatively; nothing is
//! written back.

use serde::Serialize;

use crate::compaction::compact;
use crate::context::StorageContext;
use crate::error::Result;
use crate::keys;
use crate::store::KvStore;

/// Aggregate usage figures (all sizes in chars of value)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAnalysis {
    pub total_keys: usize,
    pub total_size: usize,
    pub compressed_keys: usize,
    pub compressed_size: usize,
    pub large_keys: usize,
    pub large_size: usize,
    pub expired_keys: usize,
    pub expired_size: usize,
    pub compression_opportunities: usize,
    pub potential_savings: usize,
}

/// Read-only analysis over a storage context
pub struct Analyzer<'a, S: KvStore> {
    ctx: &'a StorageContext<S>,
}

impl<'a, S: KvStore> Analyzer<'a, S> {
    pub(crate) fn new(ctx: &'a StorageContext<S>) -> Self {
        Self { ctx }
    }

    /// Walk every entry once and tally it
    pub fn analyze(&self) -> Result<StorageAnalysis> {
        let mut analysis = StorageAnalysis::default();

        for key in self.ctx.store().keys()? {
            if let Err(e) = self.tally(&key, &mut analysis) {
                tracing::warn!(key = %key, error = %e, "analysis failed for key, skipping");
            }
        }

        Ok(analysis)
    }

    fn tally(&self, key: &str, analysis: &mut StorageAnalysis) -> Result<()> {
        let Some(value) = self.ctx.get(key)? else {
            return Ok(());
        };
        if value.is_empty() {
            return Ok(());
        }

        let size = value.chars().count();
        analysis.total_keys += 1;
        analysis.total_size += size;

        let compacted = self.ctx.is_compacted(key)?;
        if compacted {
            analysis.compressed_keys += 1;
            analysis.compressed_size += size;
        }

        if size > self.ctx.config().compaction_threshold {
            analysis.large_keys += 1;
            analysis.large_size += size;

            if !compacted {
                let shrunk = compact(&value).chars().count();
                if shrunk < size {
                    analysis.compression_opportunities += 1;
                    analysis.potential_savings += size - shrunk;
                }
            }
        }

        if let Some(raw) = self.ctx.get(&keys::last_modified_key(key))? {
            match self.ctx.expiration().is_expired_marker(&raw) {
                Some(true) => {
                    analysis.expired_keys += 1;
                    analysis.expired_size += size;
                }
                Some(false) => {}
                None => tracing::warn!(key, raw = %raw, "unparseable last-modified marker"),
            }
        }

        Ok(())
    }
}
