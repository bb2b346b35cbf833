//! Storage abstraction for codesearch.
//!
//! The [`Store`] trait covers everything the reconciler and the ranker need
//! from a project database: the project row, the file table, and the vector
//! index paired with it by file id. One store instance holds exactly one
//! project's index, with a single vector dimension fixed by [`Store::reset`].
//!
//! Implementations must keep file rows and vectors paired: every write that
//! touches one touches the other inside the same transaction.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{IndexedFile, Project, SearchResult};

/// Abstract storage backend for a project index.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert_project`](Store::upsert_project) | Insert or overwrite the project row |
/// | [`get_project`](Store::get_project) | Look up a project by alias |
/// | [`reset`](Store::reset) | Drop all files and vectors, fix the dimension |
/// | [`list_files`](Store::list_files) | All file rows, oldest first |
/// | [`replace_file`](Store::replace_file) | Atomic delete-old + insert-new pair |
/// | [`delete_file`](Store::delete_file) | Atomic delete of a file and its vector |
/// | [`knn`](Store::knn) | Nearest neighbors by cosine distance |
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert the project row, or overwrite every field if the alias exists.
    async fn upsert_project(&self, project: &Project) -> Result<()>;

    /// Fetch the project row for an alias.
    async fn get_project(&self, alias: &str) -> Result<Option<Project>>;

    /// Delete every file row and vector and fix the index dimension to `dims`.
    async fn reset(&self, dims: usize) -> Result<()>;

    /// Every file row, ascending by `created_at`, ties broken by id.
    async fn list_files(&self) -> Result<Vec<IndexedFile>>;

    /// Number of file rows.
    async fn file_count(&self) -> Result<usize>;

    /// Replace a file's row and vector in one transaction.
    ///
    /// When `old_id` is given, that file row and its vector are deleted
    /// first. A new row for `path` and its vector are then inserted. Either
    /// all of it happens or none of it. Returns the new id.
    ///
    /// Fails with [`DimensionMismatch`](crate::CodesearchError::DimensionMismatch)
    /// if `vector` does not match the index dimension.
    async fn replace_file(&self, old_id: Option<i64>, path: &str, vector: &[f32]) -> Result<i64>;

    /// Delete a file row and its vector in one transaction.
    async fn delete_file(&self, id: i64) -> Result<()>;

    /// The `k` nearest stored vectors to `query`, ascending by distance.
    ///
    /// An index that has never been reset returns no hits. A query whose
    /// length differs from the index dimension is an error.
    async fn knn(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>>;
}
