//! Data types shared between the reconciler, the ranker, and the stores.

use serde::Serialize;

/// A registered project: where its sources live and how they are embedded.
///
/// One row per alias. Written by `build`, read by `sync` and `find`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub alias: String,
    /// Absolute path of the source tree.
    pub root_path: String,
    /// Embedding provider name, e.g. `"litellm"` or `"ollama"`.
    pub provider: String,
    pub model: String,
    /// Extension filter exactly as given by the user. Empty means all files.
    pub extensions: Vec<String>,
}

/// A file row in the index. Paired with exactly one vector by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexedFile {
    /// Store-assigned, never reused. Changes every time the file is re-embedded.
    pub id: i64,
    /// Path relative to the project root, with a leading `/`.
    pub path: String,
    /// Insertion time, unix milliseconds.
    pub created_at: i64,
}

/// One hit from a nearest-neighbor query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub id: i64,
    pub path: String,
    /// Cosine distance in `[0, 2]`, or similarity when produced by
    /// [`search_by_similarity`](crate::search::search_by_similarity).
    pub distance: f64,
}

/// Outcome counters for a rebuild or sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Files embedded for the first time.
    pub added: u64,
    /// Files re-embedded and replaced under a new id.
    pub updated: u64,
    /// Index rows dropped because the file is gone locally.
    pub removed: u64,
    /// Files skipped after a read or embedding failure.
    pub failed: u64,
}

impl SyncReport {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
