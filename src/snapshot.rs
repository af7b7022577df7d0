//! Project Snapshot Protocol
//!
//! Serializes the addressable project state (settings, module inputs and
//! outputs, module 7 content) into one JSON document and applies such
//! documents back. Backups are snapshots kept under a single reserved key.
//!
//! Import is deliberately loose: only presence and truthiness of fields are
//! checked, and an absent or falsy field leaves the stored value untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::iso8601;
use crate::context::{ModuleData, StorageContext};
use crate::error::{Result, StorageError};
use crate::store::KvStore;

/// Snapshot format version written on export
pub const SNAPSHOT_VERSION: &str = "1.0";

/// A complete project snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSnapshot {
    pub version: String,
    pub export_time: String,
    pub settings: BTreeMap<String, String>,
    pub modules: BTreeMap<String, ModuleData>,
    pub module7_content: Option<String>,
    pub module7_suggestion: Option<String>,
}

/// What an import actually wrote
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub settings: usize,
    pub module_inputs: usize,
    pub module_outputs: usize,
    pub content_fields: usize,
}

/// Export/import/backup over a storage context
pub struct SnapshotProtocol<'a, S: KvStore> {
    ctx: &'a StorageContext<S>,
}

impl<'a, S: KvStore> SnapshotProtocol<'a, S> {
    pub(crate) fn new(ctx: &'a StorageContext<S>) -> Self {
        Self { ctx }
    }

    /// Gather the current project state
    pub fn snapshot(&self) -> Result<ProjectSnapshot> {
        let keys = self.ctx.keys();
        Ok(ProjectSnapshot {
            version: SNAPSHOT_VERSION.to_string(),
            export_time: iso8601(self.ctx.clock().now()),
            settings: self.ctx.settings()?,
            modules: self.ctx.modules_data()?,
            module7_content: self.ctx.load_logical(&keys.module7_content())?,
            module7_suggestion: self.ctx.load_logical(&keys.module7_suggestion())?,
        })
    }

    /// Export the project as pretty-printed JSON
    pub fn export(&self) -> Result<String> {
        let snapshot = self.snapshot()?;
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    /// Apply an exported document
    ///
    /// Fails with [`StorageError::Decode`] without touching the store if the
    /// document is not a JSON object. Otherwise every present, truthy field is
    /// written, and the last-save time is stamped once at the end.
    pub fn import(&self, document: &str) -> Result<ImportSummary> {
        let parsed: Value =
            serde_json::from_str(document).map_err(|e| StorageError::Decode(e.to_string()))?;
        let Value::Object(root) = parsed else {
            return Err(StorageError::Decode(
                "snapshot must be a JSON object".to_string(),
            ));
        };

        let keys = self.ctx.keys();
        let mut summary = ImportSummary::default();

        if let Some(Value::Object(settings)) = root.get("settings") {
            for (key, value) in settings {
                if let Some(text) = truthy_text(value) {
                    self.ctx.put_raw(key, &text)?;
                    summary.settings += 1;
                }
            }
        }

        if let Some(Value::Object(modules)) = root.get("modules") {
            for (module_id, data) in modules {
                if let Some(input) = data.get("input").filter(|v| is_truthy(v)) {
                    let raw = serde_json::to_string(input)?;
                    self.write_logical(&keys.module_input(module_id), &raw)?;
                    summary.module_inputs += 1;
                }
                if let Some(output) = data.get("output").and_then(truthy_text) {
                    self.write_logical(&keys.module_output(module_id), &output)?;
                    summary.module_outputs += 1;
                }
            }
        }

        for (field, key) in [
            ("module7Content", keys.module7_content()),
            ("module7Suggestion", keys.module7_suggestion()),
        ] {
            if let Some(text) = root.get(field).and_then(truthy_text) {
                self.write_logical(&key, &text)?;
                summary.content_fields += 1;
            }
        }

        self.ctx.touch_last_save()?;

        tracing::info!(
            settings = summary.settings,
            inputs = summary.module_inputs,
            outputs = summary.module_outputs,
            content = summary.content_fields,
            "project imported"
        );
        Ok(summary)
    }

    /// Export and keep the result under the backup key, replacing any previous backup
    pub fn backup(&self) -> Result<()> {
        let document = self.export()?;
        self.ctx.set(&self.ctx.keys().project_backup(), &document)?;
        tracing::info!("project backup created");
        Ok(())
    }

    /// Apply the stored backup
    ///
    /// Reads through the optimizer so a backup that was compacted or chunked
    /// is still found.
    pub fn restore(&self) -> Result<ImportSummary> {
        let key = self.ctx.keys().project_backup();
        let document = self
            .ctx
            .optimizer()
            .smart_load(&key)?
            .filter(|doc| !doc.is_empty())
            .ok_or(StorageError::BackupMissing)?;
        self.import(&document)
    }

    /// True if a backup is stored
    pub fn has_backup(&self) -> Result<bool> {
        let key = self.ctx.keys().project_backup();
        Ok(self.ctx.get(&key)?.is_some() || self.ctx.chunks().is_chunked(&key)?)
    }

    /// Plain write that drops any chunk family still shadowing `key`
    fn write_logical(&self, key: &str, value: &str) -> Result<()> {
        self.ctx.chunks().remove_family(key)?;
        self.ctx.put_raw(key, value)
    }
}

/// JavaScript-style truthiness
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// The stored text for a truthy scalar field
fn truthy_text(value: &Value) -> Option<String> {
    if !is_truthy(value) {
        return None;
    }
    match value {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
