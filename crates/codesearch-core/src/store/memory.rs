//! In-memory [`Store`] implementation for tests and library users.
//!
//! All state lives behind one `Mutex`, so every method is trivially atomic.
//! `created_at` is a logical clock that increments on every insert; this keeps
//! oldest-first ordering exact without depending on wall-clock resolution.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::embedding::cosine_distance;
use crate::error::CodesearchError;
use crate::models::{IndexedFile, Project, SearchResult};

use super::Store;

#[derive(Default)]
struct State {
    projects: HashMap<String, Project>,
    files: BTreeMap<i64, IndexedFile>,
    vectors: HashMap<i64, Vec<f32>>,
    dims: Option<usize>,
    next_id: i64,
    clock: i64,
}

impl State {
    fn check_dims(&self, actual: usize) -> Result<()> {
        match self.dims {
            Some(expected) if expected == actual => Ok(()),
            Some(expected) => Err(CodesearchError::DimensionMismatch { expected, actual }.into()),
            None => Err(anyhow!("vector index is not initialised; run a build first")),
        }
    }
}

/// In-memory store holding a single project's index.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    /// Number of stored vectors. Always equal to the file count.
    pub fn vector_count(&self) -> Result<usize> {
        Ok(self.lock()?.vectors.len())
    }

    /// The stored vector for a file id, if any.
    pub fn vector(&self, id: i64) -> Result<Option<Vec<f32>>> {
        Ok(self.lock()?.vectors.get(&id).cloned())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn upsert_project(&self, project: &Project) -> Result<()> {
        self.lock()?
            .projects
            .insert(project.alias.clone(), project.clone());
        Ok(())
    }

    async fn get_project(&self, alias: &str) -> Result<Option<Project>> {
        Ok(self.lock()?.projects.get(alias).cloned())
    }

    async fn reset(&self, dims: usize) -> Result<()> {
        let mut state = self.lock()?;
        state.files.clear();
        state.vectors.clear();
        state.dims = Some(dims);
        Ok(())
    }

    async fn list_files(&self) -> Result<Vec<IndexedFile>> {
        let mut files: Vec<IndexedFile> = self.lock()?.files.values().cloned().collect();
        files.sort_by_key(|f| (f.created_at, f.id));
        Ok(files)
    }

    async fn file_count(&self) -> Result<usize> {
        Ok(self.lock()?.files.len())
    }

    async fn replace_file(&self, old_id: Option<i64>, path: &str, vector: &[f32]) -> Result<i64> {
        let mut state = self.lock()?;
        // Validate before mutating so a failure leaves the old pair intact.
        state.check_dims(vector.len())?;

        if let Some(old) = old_id {
            state.vectors.remove(&old);
            state.files.remove(&old);
        }

        state.next_id += 1;
        state.clock += 1;
        let id = state.next_id;
        let created_at = state.clock;
        state.files.insert(
            id,
            IndexedFile {
                id,
                path: path.to_string(),
                created_at,
            },
        );
        state.vectors.insert(id, vector.to_vec());
        Ok(id)
    }

    async fn delete_file(&self, id: i64) -> Result<()> {
        let mut state = self.lock()?;
        state.vectors.remove(&id);
        state.files.remove(&id);
        Ok(())
    }

    async fn knn(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let state = self.lock()?;
        if state.dims.is_none() {
            return Ok(Vec::new());
        }
        state.check_dims(query.len())?;

        let mut hits: Vec<SearchResult> = state
            .files
            .values()
            .filter_map(|f| {
                state.vectors.get(&f.id).map(|v| SearchResult {
                    id: f.id,
                    path: f.path.clone(),
                    distance: cosine_distance(query, v),
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
        hits.truncate(k);
        Ok(hits)
    }
}
