//! Journal Writer
//!
//! Handles appending records to the journal file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::config::JournalSync;
use crate::error::Result;

use super::{JournalOp, JournalRecord};

/// Appends records to the journal file
pub struct JournalWriter {
    writer: BufWriter<File>,
    next_seq: u64,
    sync: JournalSync,
    /// Records written since the last fsync
    unsynced: usize,
}

impl JournalWriter {
    /// Open a journal for appending, continuing from `next_seq`
    pub fn open(path: &Path, sync: JournalSync, next_seq: u64) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
            next_seq,
            sync,
            unsynced: 0,
        })
    }

    /// Append a mutation, returning its sequence number
    pub fn append(&mut self, op: JournalOp) -> Result<u64> {
        let seq = self.next_seq;
        let frame = JournalRecord::new(seq, op).encode()?;

        self.writer.write_all(&frame)?;
        self.next_seq += 1;
        self.unsynced += 1;

        let due = match self.sync {
            JournalSync::EveryWrite => true,
            JournalSync::EveryNEntries { count } => self.unsynced >= count,
        };
        if due {
            self.sync()?;
        } else {
            self.writer.flush()?;
        }

        Ok(seq)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Sequence number the next record will get
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }
}
