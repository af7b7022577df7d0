//! Tests for the Project Snapshot Protocol
//!
//! These tests verify:
//! - Export document shape
//! - Import of every field, truthiness rules, malformed input
//! - import(export()) round-trip
//! - Backup/restore, including overwritten and missing backups

use std::sync::Arc;

use quillkv::snapshot::SNAPSHOT_VERSION;
use quillkv::{
    Config, FixedClock, KvStore, MemoryStore, ProjectSnapshot, StorageContext, StorageError,
};
use serde_json::{json, Value};

const NOW_MS: i64 = 1_760_000_000_000;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_context() -> (Arc<FixedClock>, StorageContext<MemoryStore>) {
    let clock = Arc::new(FixedClock::at_ms(NOW_MS));
    let ctx = StorageContext::with_clock(MemoryStore::new(), Config::default(), clock.clone());
    (clock, ctx)
}

fn populate(ctx: &StorageContext<MemoryStore>) {
    let keys = ctx.keys().clone();
    ctx.set("novel_writer_rag_provider", "openai").unwrap();
    ctx.set("novel_writer_writing_model", "writer-large").unwrap();
    ctx.set_json(
        &keys.module_input("module1"),
        &json!({ "idea": "a lighthouse keeper", "tone": "quiet" }),
    )
    .unwrap();
    ctx.set(&keys.module_output("module1"), "Premise: ...").unwrap();
    ctx.set(&keys.module_output("module2_5"), "第一章 灯塔\n第二章 风暴").unwrap();
    ctx.set(&keys.module7_content(), "Draft body").unwrap();
    ctx.set(&keys.module7_suggestion(), "Tighten chapter two").unwrap();
}

// =============================================================================
// Export Tests
// =============================================================================

#[test]
fn test_export_document_shape() {
    let (_clock, ctx) = setup_context();
    populate(&ctx);

    let document = ctx.snapshots().export().unwrap();
    let parsed: Value = serde_json::from_str(&document).unwrap();

    assert_eq!(parsed["version"], SNAPSHOT_VERSION);
    assert_eq!(parsed["exportTime"], "2025-10-09T08:53:20.000Z");
    assert_eq!(parsed["settings"]["novel_writer_rag_provider"], "openai");
    assert_eq!(parsed["settings"]["novel_writer_rag_api_key"], "");
    assert_eq!(parsed["modules"]["module1"]["input"]["tone"], "quiet");
    assert_eq!(parsed["modules"]["module2_5"]["output"], "第一章 灯塔\n第二章 风暴");
    assert_eq!(parsed["module7Content"], "Draft body");
    assert_eq!(parsed["module7Suggestion"], "Tighten chapter two");
}

#[test]
fn test_export_includes_outputs_moved_into_chunks() {
    let config = Config::builder().chunk_size(2000).build().unwrap();
    let ctx = StorageContext::new(MemoryStore::new(), config);
    let keys = ctx.keys().clone();
    let chapter = "The wind rose  over the hills.\n\n   Night fell slowly.  \n".repeat(108);
    ctx.set(&keys.module_output("module3"), &chapter).unwrap();
    ctx.set(&keys.module7_content(), &chapter).unwrap();

    ctx.compaction().compact_store_wide().unwrap();
    assert!(ctx.chunks().is_chunked(&keys.module_output("module3")).unwrap());
    let logical = ctx
        .optimizer()
        .smart_load(&keys.module_output("module3"))
        .unwrap()
        .unwrap();

    let exported: Value = serde_json::from_str(&ctx.snapshots().export().unwrap()).unwrap();

    assert_eq!(exported["modules"]["module3"]["output"], json!(logical));
    assert_eq!(exported["module7Content"], json!(logical));
}

#[test]
fn test_import_replaces_chunked_value() {
    let config = Config::builder().chunk_size(8).build().unwrap();
    let ctx = StorageContext::new(MemoryStore::new(), config);
    let key = ctx.keys().module_output("module3");
    ctx.chunks().store(&key, "an old chunked chapter").unwrap();

    let document = json!({ "modules": { "module3": { "output": "A new chapter" } } });
    ctx.snapshots().import(&document.to_string()).unwrap();

    assert!(!ctx.chunks().is_chunked(&key).unwrap());
    assert_eq!(ctx.get(&format!("{}_chunk_0", key)).unwrap(), None);
    assert_eq!(
        ctx.optimizer().smart_load(&key).unwrap(),
        Some("A new chapter".to_string())
    );
}

#[test]
fn test_export_empty_store() {
    let (_clock, ctx) = setup_context();

    let document = ctx.snapshots().export().unwrap();
    let snapshot: ProjectSnapshot = serde_json::from_str(&document).unwrap();

    assert_eq!(snapshot.settings.len(), 8);
    assert!(snapshot.modules.is_empty());
    assert_eq!(snapshot.module7_content, None);
}

// =============================================================================
// Import Tests
// =============================================================================

#[test]
fn test_import_malformed_json_changes_nothing() {
    let (_clock, ctx) = setup_context();
    populate(&ctx);
    let before = ctx.store().dump();

    let result = ctx.snapshots().import("{not valid json");

    assert!(matches!(result, Err(StorageError::Decode(_))));
    assert_eq!(ctx.store().dump(), before);
}

#[test]
fn test_import_non_object_is_rejected() {
    let (_clock, ctx) = setup_context();

    let result = ctx.snapshots().import("null");

    assert!(matches!(result, Err(StorageError::Decode(_))));
    assert!(ctx.store().is_empty());
}

#[test]
fn test_import_applies_every_field() {
    let (_clock, ctx) = setup_context();
    let keys = ctx.keys().clone();
    let document = json!({
        "version": "1.0",
        "settings": { "novel_writer_rag_model": "embed-small" },
        "modules": {
            "module3": { "input": { "chapter": 1 }, "output": "Opening" }
        },
        "module7Content": "Body",
        "module7Suggestion": "Advice"
    })
    .to_string();

    let summary = ctx.snapshots().import(&document).unwrap();

    assert_eq!(summary.settings, 1);
    assert_eq!(summary.module_inputs, 1);
    assert_eq!(summary.module_outputs, 1);
    assert_eq!(summary.content_fields, 2);
    assert_eq!(
        ctx.get("novel_writer_rag_model").unwrap(),
        Some("embed-small".to_string())
    );
    let input: Option<Value> = ctx.get_json(&keys.module_input("module3")).unwrap();
    assert_eq!(input, Some(json!({ "chapter": 1 })));
    assert_eq!(
        ctx.get(&keys.module_output("module3")).unwrap(),
        Some("Opening".to_string())
    );
    assert_eq!(ctx.get(&keys.module7_content()).unwrap(), Some("Body".to_string()));
}

#[test]
fn test_import_absent_and_empty_fields_leave_values_untouched() {
    let (_clock, ctx) = setup_context();
    populate(&ctx);
    let document = json!({
        "settings": { "novel_writer_rag_provider": "" },
        "modules": { "module1": { "output": null } }
    })
    .to_string();

    ctx.snapshots().import(&document).unwrap();

    assert_eq!(
        ctx.get("novel_writer_rag_provider").unwrap(),
        Some("openai".to_string())
    );
    assert_eq!(
        ctx.get(&ctx.keys().module_output("module1")).unwrap(),
        Some("Premise: ...".to_string())
    );
    assert_eq!(
        ctx.get(&ctx.keys().module7_content()).unwrap(),
        Some("Draft body".to_string())
    );
}

#[test]
fn test_import_stamps_last_save_time() {
    let (clock, ctx) = setup_context();
    clock.advance(chrono::Duration::minutes(1));

    ctx.snapshots().import("{}").unwrap();

    assert_eq!(
        ctx.last_save_time().unwrap(),
        Some("2025-10-09T08:54:20.000Z".to_string())
    );
}

#[test]
fn test_import_export_round_trip() {
    let (_clock, source) = setup_context();
    populate(&source);
    let document = source.snapshots().export().unwrap();

    let (_clock, target) = setup_context();
    target.snapshots().import(&document).unwrap();

    assert_eq!(target.settings().unwrap(), source.settings().unwrap());
    assert_eq!(target.modules_data().unwrap(), source.modules_data().unwrap());
    let keys = source.keys();
    for key in [keys.module7_content(), keys.module7_suggestion()] {
        assert_eq!(target.get(&key).unwrap(), source.get(&key).unwrap());
    }
}

#[test]
fn test_import_own_export_is_a_no_op() {
    let (_clock, ctx) = setup_context();
    populate(&ctx);
    let settings = ctx.settings().unwrap();
    let modules = ctx.modules_data().unwrap();

    let document = ctx.snapshots().export().unwrap();
    ctx.snapshots().import(&document).unwrap();

    assert_eq!(ctx.settings().unwrap(), settings);
    assert_eq!(ctx.modules_data().unwrap(), modules);
}

// =============================================================================
// Backup / Restore Tests
// =============================================================================

#[test]
fn test_backup_then_restore_reverts_output() {
    let (_clock, ctx) = setup_context();
    populate(&ctx);
    let output_key = ctx.keys().module_output("module1");

    ctx.snapshots().backup().unwrap();
    ctx.set(&output_key, "Rewritten premise").unwrap();
    ctx.snapshots().restore().unwrap();

    assert_eq!(ctx.get(&output_key).unwrap(), Some("Premise: ...".to_string()));
}

#[test]
fn test_restore_without_backup() {
    let (_clock, ctx) = setup_context();

    let result = ctx.snapshots().restore();

    assert!(matches!(result, Err(StorageError::BackupMissing)));
    assert!(!ctx.snapshots().has_backup().unwrap());
}

#[test]
fn test_restore_malformed_backup() {
    let (_clock, ctx) = setup_context();
    ctx.set(&ctx.keys().project_backup(), "{broken").unwrap();

    let result = ctx.snapshots().restore();

    assert!(matches!(result, Err(StorageError::Decode(_))));
}

#[test]
fn test_new_backup_overwrites_previous() {
    let (_clock, ctx) = setup_context();
    let output_key = ctx.keys().module_output("module1");

    ctx.set(&output_key, "first").unwrap();
    ctx.snapshots().backup().unwrap();
    ctx.set(&output_key, "second").unwrap();
    ctx.snapshots().backup().unwrap();
    ctx.set(&output_key, "third").unwrap();

    ctx.snapshots().restore().unwrap();

    assert_eq!(ctx.get(&output_key).unwrap(), Some("second".to_string()));
}

#[test]
fn test_restore_after_backup_was_chunked() {
    let (_clock, ctx) = setup_context();
    populate(&ctx);
    let output_key = ctx.keys().module_output("module3");
    let long_output = "Chapter text. ".repeat(400);
    ctx.set(&output_key, &long_output).unwrap();
    ctx.snapshots().backup().unwrap();

    let backup_key = ctx.keys().project_backup();
    let document = ctx.get(&backup_key).unwrap().unwrap();
    ctx.chunks().store_with(&backup_key, &document, 512).unwrap();
    ctx.set(&output_key, "lost").unwrap();

    assert!(ctx.snapshots().has_backup().unwrap());
    ctx.snapshots().restore().unwrap();

    assert_eq!(ctx.get(&output_key).unwrap(), Some(long_output));
}
