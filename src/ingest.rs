//! `build` and `sync` commands.
//!
//! Both resolve a [`Project`], wire the SQLite store, the HTTP embedder and
//! the filesystem source into a [`Reconciler`], and print a summary on
//! stdout. Argument and provider errors are raised before any database or
//! network access.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use codesearch_core::progress::ProgressReporter;
use codesearch_core::reconcile::Reconciler;
use codesearch_core::store::Store;
use codesearch_core::{CodesearchError, Project, SyncReport};

use crate::config::Config;
use crate::connector_fs::FsSource;
use crate::db;
use crate::embedding::{HttpEmbedder, ProviderKind};
use crate::sqlite_store::SqliteStore;

pub const DEFAULT_PROVIDER: &str = "litellm";
pub const DEFAULT_MODEL: &str = "codesearch-embedding";
pub const DEFAULT_EXTENSIONS: &str = "go,js,ts,py,java,cpp,c,h,hpp,yaml,yml";

/// Arguments of `codesearch build`, before defaults are applied.
#[derive(Debug, Clone, Default)]
pub struct BuildArgs {
    pub alias: String,
    pub path: String,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub extensions: Option<String>,
}

fn non_empty(value: Option<&str>, default: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

/// Comma-separated extension list, blanks dropped.
pub fn parse_extensions(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(String::from)
        .collect()
}

/// `.` means the working directory; the result is canonical.
fn resolve_root(path: &str) -> Result<PathBuf> {
    let raw = if path.trim().is_empty() || path == "." {
        std::env::current_dir().context("Failed to determine current directory")?
    } else {
        PathBuf::from(path)
    };
    let root = raw
        .canonicalize()
        .with_context(|| format!("Failed to resolve project path: {}", raw.display()))?;
    if !root.is_dir() {
        return Err(CodesearchError::InvalidArgs(format!(
            "project path is not a directory: {}",
            root.display()
        ))
        .into());
    }
    Ok(root)
}

/// Turn raw build arguments into a project definition.
pub fn project_from_args(args: &BuildArgs) -> Result<(Project, ProviderKind)> {
    db::validate_alias(&args.alias)?;
    let provider = non_empty(args.provider.as_deref(), DEFAULT_PROVIDER);
    let kind: ProviderKind = provider.parse()?;
    let model = non_empty(args.model.as_deref(), DEFAULT_MODEL);
    let extensions = parse_extensions(&non_empty(args.extensions.as_deref(), DEFAULT_EXTENSIONS));
    let root = resolve_root(&args.path)?;

    let project = Project {
        alias: args.alias.clone(),
        root_path: path_string(&root),
        provider,
        model,
        extensions,
    };
    Ok((project, kind))
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

pub async fn run_build(
    config: &Config,
    args: &BuildArgs,
    progress: &dyn ProgressReporter,
    cancel: CancellationToken,
) -> Result<SyncReport> {
    let (project, kind) = project_from_args(args)?;
    let embedder = HttpEmbedder::new(kind, &project.model, config)?;
    tracing::info!(
        alias = %project.alias,
        root = %project.root_path,
        provider = kind.as_str(),
        endpoint = embedder.endpoint(),
        "building project"
    );

    let pool = db::connect(config, &project.alias).await?;
    let store = SqliteStore::new(pool);
    let report = Reconciler::new(&store, &embedder, &FsSource)
        .with_progress(progress)
        .with_cancellation(cancel)
        .rebuild(&project)
        .await?;
    store.pool().close().await;

    print_report(&report);
    println!("Project '{}' built successfully", project.alias);
    Ok(report)
}

pub async fn run_sync(
    config: &Config,
    alias: &str,
    progress: &dyn ProgressReporter,
    cancel: CancellationToken,
) -> Result<SyncReport> {
    db::validate_alias(alias)?;
    let pool = db::connect_existing(config, alias).await?;
    let store = SqliteStore::new(pool);
    let project = load_project(&store, alias).await?;

    let embedder = HttpEmbedder::from_provider_name(&project.provider, &project.model, config)?;
    tracing::info!(alias, root = %project.root_path, endpoint = embedder.endpoint(), "syncing project");

    let report = Reconciler::new(&store, &embedder, &FsSource)
        .with_progress(progress)
        .with_cancellation(cancel)
        .sync(&project)
        .await?;
    store.pool().close().await;

    print_report(&report);
    println!("Project '{}' synced successfully", project.alias);
    Ok(report)
}

/// The stored project row, or [`CodesearchError::ProjectNotFound`].
pub async fn load_project(store: &dyn Store, alias: &str) -> Result<Project> {
    store
        .get_project(alias)
        .await
        .context("error getting project metadata")?
        .ok_or_else(|| CodesearchError::ProjectNotFound(alias.to_string()).into())
}

fn print_report(report: &SyncReport) {
    println!("  added: {}", report.added);
    println!("  updated: {}", report.updated);
    println!("  removed: {}", report.removed);
    if report.has_failures() {
        println!("  failed: {} (retried on next sync)", report.failed);
    }
}
