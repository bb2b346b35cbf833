//! Filesystem [`SourceTree`].
//!
//! Walks the project root with walkdir and keeps files whose name matches
//! one of the normalised extensions (case-insensitive). An empty filter
//! keeps every file.
//!
//! Hidden entries are pruned at every level below the root: a hidden file
//! is skipped and a hidden directory is not descended into, so `.git/` and
//! `.github/workflows/*.yml` are never indexed.

use anyhow::{bail, Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

use codesearch_core::source::{normalize_extensions, SourceTree};

pub struct FsSource;

impl SourceTree for FsSource {
    fn list_files(&self, root: &str, extensions: &[String]) -> Result<Vec<String>> {
        let root = Path::new(root);
        if !root.is_dir() {
            bail!("source root does not exist: {}", root.display());
        }

        let include_set = build_extension_set(&normalize_extensions(extensions))?;

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "error accessing path, skipping");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            if let Some(set) = &include_set {
                if !set.is_match(entry.file_name()) {
                    continue;
                }
            }

            files.push(relative_path(root, entry.path()));
        }

        // Sort for deterministic ordering
        files.sort();

        Ok(files)
    }

    fn read_file(&self, root: &str, path: &str) -> Result<String> {
        let full = Path::new(root).join(path.trim_start_matches('/'));
        std::fs::read_to_string(&full)
            .with_context(|| format!("Failed to read file: {}", full.display()))
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

/// Root-relative path with a leading `/` and forward slashes.
fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    format!("/{}", parts.join("/"))
}

/// `*<ext>` globs matched against the file name, or `None` for no filter.
fn build_extension_set(extensions: &[String]) -> Result<Option<GlobSet>> {
    if extensions.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for ext in extensions {
        builder.add(
            GlobBuilder::new(&format!("*{}", ext))
                .case_insensitive(true)
                .literal_separator(true)
                .build()?,
        );
    }
    Ok(Some(builder.build()?))
}
