//! Rebuild and incremental sync of a project index.
//!
//! [`Reconciler::rebuild`] replaces the whole index. [`Reconciler::sync`]
//! diffs local paths `L` against stored rows `S` and applies:
//!
//! | Set | Action |
//! |-----|--------|
//! | `L \ S` | embed and insert |
//! | `S ∩ L` | re-embed and replace under a new id, oldest row first |
//! | `S \ L` | delete row and vector |
//!
//! Existing files are re-embedded on every sync; there is no content digest.
//!
//! # Failure handling
//!
//! A file that cannot be read or embedded is logged and skipped, so it stays
//! in whatever state it had and is retried next run. A store error aborts
//! the run. Each file's write is its own transaction, so everything written
//! before the abort stays. Cancelling the token aborts the in-flight
//! embedding request and stops the run with
//! [`CodesearchError::Cancelled`].

use std::collections::HashSet;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::embedding::Embedder;
use crate::error::CodesearchError;
use crate::models::{IndexedFile, Project, SyncReport};
use crate::progress::{NoProgress, Operation, ProgressEvent, ProgressReporter};
use crate::source::SourceTree;
use crate::store::Store;

/// Text sent to the embedder to learn the vector dimension.
pub const DIMENSION_SAMPLE: &str = "1";

/// The actions a sync will take, computed before any write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    /// Local paths with no stored row, in enumeration order.
    pub added: Vec<String>,
    /// Stored rows still present locally, oldest first.
    pub updated: Vec<IndexedFile>,
    /// Stored rows whose file is gone, oldest first.
    pub removed: Vec<IndexedFile>,
}

impl SyncPlan {
    pub fn len(&self) -> usize {
        self.added.len() + self.updated.len() + self.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Diff local paths against stored rows.
pub fn plan_sync(local: &[String], stored: &[IndexedFile]) -> SyncPlan {
    let local_set: HashSet<&str> = local.iter().map(String::as_str).collect();
    let stored_set: HashSet<&str> = stored.iter().map(|f| f.path.as_str()).collect();

    let mut seen = HashSet::new();
    let added = local
        .iter()
        .filter(|p| !stored_set.contains(p.as_str()) && seen.insert(p.as_str()))
        .cloned()
        .collect();

    let mut existing = stored.to_vec();
    existing.sort_by_key(|f| (f.created_at, f.id));
    let (updated, removed): (Vec<IndexedFile>, Vec<IndexedFile>) = existing
        .into_iter()
        .partition(|f| local_set.contains(f.path.as_str()));

    SyncPlan {
        added,
        updated,
        removed,
    }
}

/// The text embedded for a file: its path on the first line, then its content.
pub fn embedding_text(path: &str, content: &str) -> String {
    format!("{}\n{}", path, content)
}

/// Drives rebuild and sync for one project against injected backends.
pub struct Reconciler<'a> {
    store: &'a dyn Store,
    embedder: &'a dyn Embedder,
    source: &'a dyn SourceTree,
    progress: &'a dyn ProgressReporter,
    cancel: CancellationToken,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn Store, embedder: &'a dyn Embedder, source: &'a dyn SourceTree) -> Self {
        Self {
            store,
            embedder,
            source,
            progress: &NoProgress,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Stop at the next file boundary, or mid-request, once `token` fires.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Wipe the index and embed every local file from scratch.
    ///
    /// Also writes the project row, so this is how a project is created.
    pub async fn rebuild(&self, project: &Project) -> Result<SyncReport> {
        let dims = self.detect_dimensions().await?;
        info!(alias = %project.alias, dims, model = self.embedder.model_name(), "rebuilding index");

        self.store
            .upsert_project(project)
            .await
            .context("error saving project metadata")?;
        self.store
            .reset(dims)
            .await
            .context("error deleting existing vector data")?;

        self.progress.report(ProgressEvent::Discovering {
            op: Operation::Build,
            alias: project.alias.clone(),
        });
        let files = self
            .source
            .list_files(&project.root_path, &project.extensions)
            .context("error finding files")?;
        info!(alias = %project.alias, files = files.len(), "found files");

        let total = files.len() as u64;
        let mut report = SyncReport::default();
        for (i, path) in files.iter().enumerate() {
            self.check_cancelled()?;
            debug!(path = %path, "processing file");
            match self.embed_file(project, path).await? {
                Some(vector) => {
                    self.store
                        .replace_file(None, path, &vector)
                        .await
                        .with_context(|| format!("error saving embedding for file {}", path))?;
                    report.added += 1;
                }
                None => report.failed += 1,
            }
            self.progress.report(ProgressEvent::Processing {
                op: Operation::Build,
                alias: project.alias.clone(),
                n: i as u64 + 1,
                total,
            });
        }

        info!(alias = %project.alias, added = report.added, failed = report.failed, "build finished");
        Ok(report)
    }

    /// Bring the index in line with the source tree.
    pub async fn sync(&self, project: &Project) -> Result<SyncReport> {
        self.progress.report(ProgressEvent::Discovering {
            op: Operation::Sync,
            alias: project.alias.clone(),
        });
        let local = self
            .source
            .list_files(&project.root_path, &project.extensions)
            .context("error finding local files")?;
        let stored = self
            .store
            .list_files()
            .await
            .context("error getting existing file paths")?;

        let plan = plan_sync(&local, &stored);
        info!(
            alias = %project.alias,
            new = plan.added.len(),
            existing = plan.updated.len(),
            removed = plan.removed.len(),
            "sync plan"
        );

        let total = plan.len() as u64;
        let mut n = 0u64;
        let mut report = SyncReport::default();

        for path in &plan.added {
            self.check_cancelled()?;
            info!(path = %path, "adding new file");
            match self.embed_file(project, path).await? {
                Some(vector) => {
                    self.store
                        .replace_file(None, path, &vector)
                        .await
                        .with_context(|| format!("error saving embedding for file {}", path))?;
                    report.added += 1;
                }
                None => report.failed += 1,
            }
            n += 1;
            self.report_sync(project, n, total);
        }

        for file in &plan.updated {
            self.check_cancelled()?;
            info!(path = %file.path, id = file.id, "updating file");
            match self.embed_file(project, &file.path).await? {
                Some(vector) => {
                    self.store
                        .replace_file(Some(file.id), &file.path, &vector)
                        .await
                        .with_context(|| {
                            format!("error updating embedding for file {}", file.path)
                        })?;
                    report.updated += 1;
                }
                None => report.failed += 1,
            }
            n += 1;
            self.report_sync(project, n, total);
        }

        for file in &plan.removed {
            self.check_cancelled()?;
            info!(path = %file.path, id = file.id, "removing deleted file");
            self.store
                .delete_file(file.id)
                .await
                .with_context(|| format!("error deleting file and vector for {}", file.path))?;
            report.removed += 1;
            n += 1;
            self.report_sync(project, n, total);
        }

        info!(
            alias = %project.alias,
            added = report.added,
            updated = report.updated,
            removed = report.removed,
            failed = report.failed,
            "sync finished"
        );
        Ok(report)
    }

    fn report_sync(&self, project: &Project, n: u64, total: u64) {
        self.progress.report(ProgressEvent::Processing {
            op: Operation::Sync,
            alias: project.alias.clone(),
            n,
            total,
        });
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(CodesearchError::Cancelled.into());
        }
        Ok(())
    }

    /// Embed `text`, racing the request against the cancellation token.
    async fn embed_cancellable(&self, text: &str) -> Result<Result<Vec<f32>>> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CodesearchError::Cancelled.into()),
            result = self.embedder.embed(text) => Ok(result),
        }
    }

    async fn detect_dimensions(&self) -> Result<usize> {
        let vector = self
            .embed_cancellable(DIMENSION_SAMPLE)
            .await?
            .context("error generating embedding for dimensions")?;
        if vector.is_empty() {
            return Err(CodesearchError::EmptyEmbedding.into());
        }
        Ok(vector.len())
    }

    /// Read and embed one file. `Ok(None)` means the file was skipped.
    async fn embed_file(&self, project: &Project, path: &str) -> Result<Option<Vec<f32>>> {
        let content = match self.source.read_file(&project.root_path, path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path, error = %e, "error reading file, skipping");
                return Ok(None);
            }
        };

        match self.embed_cancellable(&embedding_text(path, &content)).await? {
            Ok(vector) if vector.is_empty() => {
                warn!(path = %path, "provider returned an empty embedding, skipping");
                Ok(None)
            }
            Ok(vector) => Ok(Some(vector)),
            Err(e) => {
                warn!(path = %path, error = %e, "error generating embeddings, skipping");
                Ok(None)
            }
        }
    }
}
