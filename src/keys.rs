//! Key Namespace
//!
//! Reserved keys shared with the rest of the writing tool, and the metadata
//! suffixes that make up a key family:
//!
//! ```text
//! K                  primary value (absent when chunked)
//! K_last_modified    epoch millis of the last write
//! K_compressed       "true" once the value (or each chunk) is compacted
//! K_chunks           chunk count n
//! K_chunk_0..n-1     chunk segments
//! ```

pub const LAST_MODIFIED_SUFFIX: &str = "_last_modified";
pub const COMPRESSED_SUFFIX: &str = "_compressed";
pub const CHUNKS_SUFFIX: &str = "_chunks";
pub const CHUNK_SUFFIX: &str = "_chunk_";

/// Sentinel stored under `K_compressed`
pub const COMPRESSED_MARKER: &str = "true";

/// Names of the eight provider settings, without prefix
const SETTING_NAMES: [&str; 8] = [
    "rag_provider",
    "rag_api_key",
    "rag_base_url",
    "rag_model",
    "writing_provider",
    "writing_api_key",
    "writing_base_url",
    "writing_model",
];

/// Reserved key namespace, parameterized by a prefix
#[derive(Debug, Clone)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    fn named(&self, name: &str) -> String {
        format!("{}_{}", self.prefix, name)
    }

    /// All eight setting keys, RAG first then writing
    pub fn settings(&self) -> Vec<String> {
        SETTING_NAMES.iter().map(|name| self.named(name)).collect()
    }

    pub fn rag_api_key(&self) -> String {
        self.named("rag_api_key")
    }

    pub fn writing_api_key(&self) -> String {
        self.named("writing_api_key")
    }

    pub fn module_input(&self, module_id: &str) -> String {
        format!("{}_{}_input", self.prefix, module_id)
    }

    pub fn module_output(&self, module_id: &str) -> String {
        format!("{}_{}_output", self.prefix, module_id)
    }

    pub fn module7_content(&self) -> String {
        self.named("module7_content")
    }

    pub fn module7_suggestion(&self) -> String {
        self.named("module7_suggestion")
    }

    pub fn project_backup(&self) -> String {
        self.named("project_backup")
    }

    pub fn last_save_time(&self) -> String {
        self.named("last_save_time")
    }
}

// =============================================================================
// Key Family Helpers
// =============================================================================

pub fn last_modified_key(key: &str) -> String {
    format!("{key}{LAST_MODIFIED_SUFFIX}")
}

pub fn compressed_key(key: &str) -> String {
    format!("{key}{COMPRESSED_SUFFIX}")
}

pub fn chunks_key(key: &str) -> String {
    format!("{key}{CHUNKS_SUFFIX}")
}

pub fn chunk_key(key: &str, index: usize) -> String {
    format!("{key}{CHUNK_SUFFIX}{index}")
}

/// "draft_last_modified" → Some("draft")
pub fn strip_last_modified(key: &str) -> Option<&str> {
    key.strip_suffix(LAST_MODIFIED_SUFFIX)
}

/// True if `key` is a chunk segment (`..._chunk_<digits>`)
fn is_chunk_segment(key: &str) -> bool {
    match key.rfind(CHUNK_SUFFIX) {
        Some(pos) => {
            let index = &key[pos + CHUNK_SUFFIX.len()..];
            !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

/// True if `candidate` is a chunk segment of `key` (`key_chunk_<digits>`)
pub fn is_chunk_of(candidate: &str, key: &str) -> bool {
    candidate
        .strip_prefix(key)
        .and_then(|rest| rest.strip_prefix(CHUNK_SUFFIX))
        .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}

/// True if `key` belongs to another key's metadata rather than holding a
/// logical value of its own
pub fn is_metadata_key(key: &str) -> bool {
    key.ends_with(LAST_MODIFIED_SUFFIX)
        || key.ends_with(COMPRESSED_SUFFIX)
        || key.ends_with(CHUNKS_SUFFIX)
        || is_chunk_segment(key)
}
