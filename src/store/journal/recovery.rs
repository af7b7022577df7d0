//! Journal Recovery
//!
//! Replays the journal on open and cuts off a torn or corrupted tail.

use std::fs::{self, OpenOptions};
use std::path::Path;

use crate::error::{Result, StorageError};

use super::JournalRecord;

/// Handles journal recovery after a crash
pub struct JournalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Number of records successfully recovered
    pub records_recovered: u64,

    /// Last valid sequence number (0 if none)
    pub last_seq: u64,

    /// Bytes discarded after the last valid record
    pub bytes_discarded: u64,

    /// Whether the file was truncated
    pub was_truncated: bool,
}

impl JournalRecovery {
    /// Recover records from a journal file
    ///
    /// This will:
    /// 1. Read frames until the first torn or corrupted one
    /// 2. Truncate the file to the end of the last valid frame
    /// 3. Return all valid records in order
    pub fn recover(path: &Path) -> Result<(Vec<JournalRecord>, RecoveryReport)> {
        let (records, report, valid_len) = Self::scan(path)?;

        if report.was_truncated {
            tracing::warn!(
                path = %path.display(),
                discarded = report.bytes_discarded,
                "truncating damaged journal tail"
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_len)?;
            file.sync_all()?;
        }

        Ok((records, report))
    }

    /// Verify integrity of a journal file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryReport> {
        let (_, report, _) = Self::scan(path)?;
        Ok(report)
    }

    fn scan(path: &Path) -> Result<(Vec<JournalRecord>, RecoveryReport, u64)> {
        let bytes = fs::read(path)?;
        let mut records = Vec::new();
        let mut report = RecoveryReport::default();
        let mut offset = 0usize;

        while offset < bytes.len() {
            match JournalRecord::decode(&bytes[offset..]) {
                Ok(Some((record, consumed))) => {
                    if record.seq <= report.last_seq && report.records_recovered > 0 {
                        tracing::warn!(seq = record.seq, "out-of-order journal record");
                        break;
                    }
                    report.last_seq = record.seq;
                    report.records_recovered += 1;
                    records.push(record);
                    offset += consumed;
                }
                Ok(None) => break,
                Err(StorageError::JournalCorruption(reason)) => {
                    tracing::warn!(offset, %reason, "corrupted journal frame");
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        report.bytes_discarded = (bytes.len() - offset) as u64;
        report.was_truncated = report.bytes_discarded > 0;
        Ok((records, report, offset as u64))
    }
}
