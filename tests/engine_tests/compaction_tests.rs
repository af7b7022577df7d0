//! Tests for the Compaction Engine
//!
//! These tests verify:
//! - Threshold behaviour of should_compact
//! - Store-wide compaction: plain rewrite, chunked rewrite, skips
//! - Idempotence of both the transform and the store-wide pass

use std::sync::Arc;

use proptest::prelude::*;
use quillkv::compaction::compact;
use quillkv::{Config, FixedClock, KvStore, MemoryStore, StorageContext};

const NOW_MS: i64 = 1_760_000_000_000;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_context(chunk_size: usize) -> StorageContext<MemoryStore> {
    let config = Config::builder().chunk_size(chunk_size).build().unwrap();
    let clock = Arc::new(FixedClock::at_ms(NOW_MS));
    StorageContext::with_clock(MemoryStore::new(), config, clock)
}

/// Prose with doubled spaces and blank lines, 56 chars per paragraph
fn airy_prose(paragraphs: usize) -> String {
    "The wind rose  over the hills.\n\n   Night fell slowly.  \n".repeat(paragraphs)
}

// =============================================================================
// Threshold Tests
// =============================================================================

#[test]
fn test_should_compact_threshold() {
    let ctx = setup_context(1024);
    let engine = ctx.compaction();

    assert!(!engine.should_compact(&"x".repeat(999)));
    assert!(!engine.should_compact(&"x".repeat(1000)));
    assert!(engine.should_compact(&"x".repeat(1001)));
    assert!(!engine.should_compact(""));
}

#[test]
fn test_should_compact_counts_chars_not_bytes() {
    let ctx = setup_context(1024);

    // 600 chars, 1800 bytes
    assert!(!ctx.compaction().should_compact(&"章".repeat(600)));
}

// =============================================================================
// Store-Wide Compaction Tests
// =============================================================================

#[test]
fn test_compact_store_wide_plain_rewrite() {
    let ctx = setup_context(50 * 1024);
    let original = airy_prose(30);
    ctx.store().set("story", &original).unwrap();

    let report = ctx.compaction().compact_store_wide().unwrap();

    let expected = compact(&original);
    assert_eq!(report.compacted, 1);
    assert_eq!(report.saved, original.len() - expected.len());
    assert_eq!(ctx.get("story").unwrap(), Some(expected));
    assert_eq!(ctx.get("story_compressed").unwrap(), Some("true".to_string()));
    assert_eq!(
        ctx.get("story_last_modified").unwrap(),
        Some(NOW_MS.to_string())
    );
}

#[test]
fn test_compact_store_wide_chunks_large_results() {
    let ctx = setup_context(1024);
    let original = airy_prose(100);
    ctx.store().set("story", &original).unwrap();

    let report = ctx.compaction().compact_store_wide().unwrap();

    assert_eq!(report.compacted, 1);
    assert_eq!(ctx.get("story").unwrap(), None);
    assert!(ctx.chunks().is_chunked("story").unwrap());
    assert_eq!(
        ctx.optimizer().smart_load("story").unwrap(),
        Some(compact(&original))
    );
    assert!(ctx.get("story_last_modified").unwrap().is_some());
}

#[test]
fn test_compact_store_wide_skips_small_values() {
    let ctx = setup_context(1024);
    ctx.store().set("note", "short   note").unwrap();

    let report = ctx.compaction().compact_store_wide().unwrap();

    assert_eq!(report.compacted, 0);
    assert_eq!(ctx.get("note").unwrap(), Some("short   note".to_string()));
}

#[test]
fn test_compact_store_wide_skips_values_that_do_not_shrink() {
    let ctx = setup_context(50 * 1024);
    let dense = "word ".repeat(300).trim_end().to_string();
    ctx.store().set("dense", &dense).unwrap();

    let report = ctx.compaction().compact_store_wide().unwrap();

    assert_eq!(report.compacted, 0);
    assert_eq!(ctx.get("dense_compressed").unwrap(), None);
}

#[test]
fn test_compact_store_wide_skips_marked_keys() {
    let ctx = setup_context(50 * 1024);
    let original = airy_prose(30);
    ctx.store().set("story", &original).unwrap();
    ctx.store().set("story_compressed", "true").unwrap();

    let report = ctx.compaction().compact_store_wide().unwrap();

    assert_eq!(report.compacted, 0);
    assert_eq!(ctx.get("story").unwrap(), Some(original));
}

#[test]
fn test_compact_store_wide_ignores_metadata_keys() {
    let ctx = setup_context(50 * 1024);
    ctx.store().set("story_chunk_0", &airy_prose(30)).unwrap();

    let report = ctx.compaction().compact_store_wide().unwrap();

    assert_eq!(report.compacted, 0);
    assert_eq!(ctx.get("story_chunk_0_compressed").unwrap(), None);
}

#[test]
fn test_compact_store_wide_is_idempotent() {
    let ctx = setup_context(1024);
    ctx.store().set("small", &airy_prose(30)).unwrap();
    ctx.store().set("large", &airy_prose(100)).unwrap();

    let first = ctx.compaction().compact_store_wide().unwrap();
    let after_first = ctx.store().dump();
    let second = ctx.compaction().compact_store_wide().unwrap();

    assert_eq!(first.compacted, 2);
    assert_eq!(second.compacted, 0);
    assert_eq!(second.saved, 0);
    assert_eq!(ctx.store().dump(), after_first);
}

#[test]
fn test_compact_store_wide_isolates_faulty_keys() {
    // Compaction saves one char, too little room for the marker write
    let value = format!("{}  b", "a".repeat(1000));
    let ctx = StorageContext::new(MemoryStore::with_capacity(5 + 1003), Config::default());
    ctx.store().set("story", &value).unwrap();

    let report = ctx.compaction().compact_store_wide().unwrap();

    assert_eq!(report.compacted, 0);
    assert_eq!(report.skipped, 1);
    assert_eq!(ctx.get("story_compressed").unwrap(), None);
    assert_eq!(ctx.get("story").unwrap(), Some(value));
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #[test]
    fn prop_compact_is_idempotent(value in "[a-z \\t\\n]{0,300}") {
        let once = compact(&value);
        prop_assert_eq!(compact(&once), once);
    }

    #[test]
    fn prop_compact_never_grows(value in "[a-z \\t\\n]{0,300}") {
        prop_assert!(compact(&value).len() <= value.len());
    }
}
