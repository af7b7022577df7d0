//! Journal-backed store
//!
//! A [`KvStore`] whose state lives in memory and is made durable by an
//! append-only journal. Every mutation is journaled before it is applied.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Record 1                                │
//! │ ┌─────────┬─────────┬─────────────────┐ │
//! │ │ CRC (4) │ Len (4) │ bincode payload │ │
//! │ └─────────┴─────────┴─────────────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Record 2 ...                            │
//! └─────────────────────────────────────────┘
//! ```
//!
//! `checkpoint()` rewrites the journal with one `Set` per live key so that
//! overwritten and removed values stop taking disk space.

mod record;
mod writer;
mod recovery;

pub use record::{JournalOp, JournalRecord};
pub use recovery::{JournalRecovery, RecoveryReport};
pub use writer::JournalWriter;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};

use crate::config::JournalSync;
use crate::error::Result;

use super::{Entries, KvStore};

/// File-backed implementation of [`KvStore`]
///
/// Lock order: `journal` → `entries`.
pub struct JournalStore {
    path: PathBuf,
    sync: JournalSync,
    journal: Mutex<JournalWriter>,
    entries: RwLock<Entries>,
    capacity: Option<usize>,
}

impl JournalStore {
    /// Open or create a journal-backed store
    ///
    /// On open:
    /// 1. Create the parent directory if needed
    /// 2. Replay the journal (discarding a damaged tail)
    /// 3. Reopen the journal for appending
    pub fn open(path: &Path, sync: JournalSync) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut entries = Entries::default();
        let mut next_seq = 1;

        if path.exists() {
            let (records, report) = JournalRecovery::recover(path)?;
            if report.records_recovered > 0 || report.was_truncated {
                tracing::debug!(
                    recovered = report.records_recovered,
                    last_seq = report.last_seq,
                    truncated = report.was_truncated,
                    "journal replayed"
                );
            }

            for record in records {
                Self::apply(&mut entries, record.op);
            }
            next_seq = report.last_seq + 1;
        }

        let journal = JournalWriter::open(path, sync, next_seq)?;

        Ok(Self {
            path: path.to_path_buf(),
            sync,
            journal: Mutex::new(journal),
            entries: RwLock::new(entries),
            capacity: None,
        })
    }

    /// Enforce a capacity (in chars) on subsequent writes
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Rewrite the journal so it holds exactly one record per live key
    ///
    /// Writes to a sibling temp file, fsyncs, then renames over the journal.
    pub fn checkpoint(&self) -> Result<()> {
        let mut journal = self.journal.lock();
        let entries = self.entries.read();

        let tmp_path = self.path.with_extension("tmp");
        let mut seq = 0;
        {
            let mut out = BufWriter::new(File::create(&tmp_path)?);
            for (key, value) in entries.iter() {
                seq += 1;
                let record = JournalRecord::new(
                    seq,
                    JournalOp::Set {
                        key: key.clone(),
                        value: value.clone(),
                    },
                );
                out.write_all(&record.encode()?)?;
            }
            out.flush()?;
            out.get_ref().sync_all()?;
        }

        fs::rename(&tmp_path, &self.path)?;
        *journal = JournalWriter::open(&self.path, self.sync, seq + 1)?;

        tracing::info!(records = seq, path = %self.path.display(), "journal checkpointed");
        Ok(())
    }

    /// Force pending journal records to disk
    pub fn sync(&self) -> Result<()> {
        self.journal.lock().sync()
    }

    /// Path of the journal file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn apply(entries: &mut Entries, op: JournalOp) {
        match op {
            JournalOp::Set { key, value } => entries.insert(key, value),
            JournalOp::Remove { key } => entries.remove(&key),
            JournalOp::Clear => entries.clear(),
        }
    }

    fn journal_and_apply(&self, op: JournalOp) -> Result<()> {
        let mut journal = self.journal.lock();
        journal.append(op.clone())?;
        Self::apply(&mut self.entries.write(), op);
        Ok(())
    }
}

impl KvStore for JournalStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.read().check_quota(key, value, self.capacity)?;
        self.journal_and_apply(JournalOp::Set {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        if self.entries.read().get(key).is_none() {
            return Ok(());
        }
        self.journal_and_apply(JournalOp::Remove {
            key: key.to_string(),
        })
    }

    fn key_count(&self) -> Result<usize> {
        Ok(self.entries.read().len())
    }

    fn key_at(&self, index: usize) -> Result<Option<String>> {
        Ok(self.entries.read().key_at(index))
    }

    fn clear(&self) -> Result<()> {
        self.journal_and_apply(JournalOp::Clear)
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

impl Drop for JournalStore {
    fn drop(&mut self) {
        if let Err(e) = self.journal.get_mut().sync() {
            tracing::warn!(error = %e, "failed to sync journal on drop");
        }
    }
}
