//! Journal record definitions
//!
//! Defines the structure and framing of individual journal records.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StorageError};

/// Frame header: CRC32 (4) + payload length (4)
pub const HEADER_SIZE: usize = 8;

/// Largest payload a frame may claim (guards against garbage lengths)
pub const MAX_PAYLOAD_SIZE: usize = 256 * 1024 * 1024;

/// A single record in the journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalRecord {
    /// Sequence number - monotonically increasing
    pub seq: u64,

    /// The mutation to replay
    pub op: JournalOp,
}

/// Mutations that can be journaled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JournalOp {
    /// Create or overwrite a key
    Set { key: String, value: String },

    /// Delete a key
    Remove { key: String },

    /// Delete every key
    Clear,
}

impl JournalRecord {
    pub fn new(seq: u64, op: JournalOp) -> Self {
        Self { seq, op }
    }

    /// Encode into a frame: `[crc32][len][bincode payload]`
    pub fn encode(&self) -> Result<Bytes> {
        let payload = bincode::serialize(self)?;
        let crc = crc32fast::hash(&payload);

        let mut frame = BytesMut::with_capacity(HEADER_SIZE + payload.len());
        frame.put_u32_le(crc);
        frame.put_u32_le(payload.len() as u32);
        frame.put_slice(&payload);
        Ok(frame.freeze())
    }

    /// Decode one frame from the front of `bytes`
    ///
    /// Returns:
    /// - `Ok(Some((record, consumed)))` for a valid frame
    /// - `Ok(None)` if `bytes` ends before the frame does (torn write)
    /// - `Err(JournalCorruption)` on checksum mismatch or an undecodable payload
    pub fn decode(bytes: &[u8]) -> Result<Option<(Self, usize)>> {
        if bytes.len() < HEADER_SIZE {
            return Ok(None);
        }

        let crc = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let len = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;

        if len > MAX_PAYLOAD_SIZE {
            return Err(StorageError::JournalCorruption(format!(
                "frame claims {} bytes (max {})",
                len, MAX_PAYLOAD_SIZE
            )));
        }

        let total = HEADER_SIZE + len;
        if bytes.len() < total {
            return Ok(None);
        }

        let payload = &bytes[HEADER_SIZE..total];
        let actual = crc32fast::hash(payload);
        if actual != crc {
            return Err(StorageError::JournalCorruption(format!(
                "CRC mismatch: expected {:08x}, got {:08x}",
                crc, actual
            )));
        }

        let record: JournalRecord = bincode::deserialize(payload)
            .map_err(|e| StorageError::JournalCorruption(e.to_string()))?;
        Ok(Some((record, total)))
    }
}
