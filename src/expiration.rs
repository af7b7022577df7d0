//! Expiration Engine
//!
//! Reclaims key families whose `_last_modified` marker is older than the
//! retention window.

use serde::Serialize;

use crate::clock::parse_timestamp_ms;
use crate::context::StorageContext;
use crate::error::{Result, StorageError};
use crate::keys;
use crate::store::KvStore;

/// Outcome of a reclamation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReclaimReport {
    /// Key families deleted
    pub reclaimed: usize,

    /// Chars freed: primary values plus chunk segments
    pub freed: usize,

    /// Markers that could not be parsed
    pub skipped: usize,
}

/// Expiration over a storage context
pub struct ExpirationEngine<'a, S: KvStore> {
    ctx: &'a StorageContext<S>,
}

impl<'a, S: KvStore> ExpirationEngine<'a, S> {
    pub(crate) fn new(ctx: &'a StorageContext<S>) -> Self {
        Self { ctx }
    }

    /// Whether a raw `_last_modified` marker is past the retention window
    ///
    /// Returns `None` if the marker is neither epoch millis nor RFC 3339.
    pub fn is_expired_marker(&self, raw: &str) -> Option<bool> {
        let modified = parse_timestamp_ms(raw)?;
        let age = self.ctx.clock().now_ms().saturating_sub(modified);
        Some(age > self.ctx.config().retention_ms())
    }

    /// Delete every expired key family
    pub fn reclaim(&self) -> Result<ReclaimReport> {
        let mut report = ReclaimReport::default();

        // Snapshot keys first: reclamation deletes as it goes
        for key in self.ctx.store().keys()? {
            let Some(data_key) = keys::strip_last_modified(&key) else {
                continue;
            };

            match self.reclaim_key(&key, data_key) {
                Ok(Some(freed)) => {
                    report.reclaimed += 1;
                    report.freed += freed;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "expiration check failed for key, skipping");
                    report.skipped += 1;
                }
            }
        }

        tracing::info!(
            reclaimed = report.reclaimed,
            freed = report.freed,
            skipped = report.skipped,
            "expired data reclaimed"
        );
        Ok(report)
    }

    /// Reclaim one family if expired; returns chars freed
    fn reclaim_key(&self, marker_key: &str, data_key: &str) -> Result<Option<usize>> {
        let Some(raw) = self.ctx.get(marker_key)? else {
            return Ok(None);
        };
        let expired = self.is_expired_marker(&raw).ok_or_else(|| {
            StorageError::Decode(format!("unparseable last-modified marker {raw:?}"))
        })?;
        if !expired {
            return Ok(None);
        }

        let mut freed = self
            .ctx
            .get(data_key)?
            .map(|v| v.chars().count())
            .unwrap_or(0);

        self.ctx.remove(marker_key)?;
        self.ctx.remove(data_key)?;
        freed += self.ctx.chunks().remove_family(data_key)?;

        tracing::debug!(key = data_key, freed, "reclaimed expired entry");
        Ok(Some(freed))
    }
}
