//! # QuillKV
//!
//! Storage optimization layer for a writing workspace that persists into a
//! small, synchronous, string-keyed store:
//! - Transparent chunking of oversized values
//! - Whitespace compaction of prose-like values
//! - Expiration of stale key families
//! - Read-only usage analysis
//! - Project export/import/backup as one JSON snapshot
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Snapshot Protocol / Optimizer                   │
//! │         (export, import, backup, smart save/load)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   StorageContext                             │
//! │        (facade: get/set/JSON, last-save bookkeeping)         │
//! └──────┬──────────────┬──────────────┬──────────────┬─────────┘
//!        │              │              │              │
//!        ▼              ▼              ▼              ▼
//!  ┌──────────┐  ┌────────────┐  ┌────────────┐  ┌──────────┐
//!  │  Chunk   │  │ Compaction │  │ Expiration │  │ Analyzer │
//!  └────┬─────┘  └─────┬──────┘  └─────┬──────┘  └────┬─────┘
//!       └──────────────┴───────┬───────┴──────────────┘
//!                              ▼
//!                      ┌───────────────┐
//!                      │    KvStore    │
//!                      │ Memory/Journal│
//!                      └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod clock;
pub mod keys;

pub mod store;
pub mod context;
pub mod chunk;
pub mod compaction;
pub mod expiration;
pub mod analyzer;
pub mod snapshot;
pub mod optimizer;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, StorageError};
pub use config::{Config, JournalSync};
pub use clock::{Clock, FixedClock, SystemClock};
pub use context::{ModuleData, StorageContext, StorageStats};
pub use store::{JournalStore, KvStore, MemoryStore};
pub use analyzer::StorageAnalysis;
pub use snapshot::{ImportSummary, ProjectSnapshot};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of QuillKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
