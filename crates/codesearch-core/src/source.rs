//! Source tree abstraction: what files a project has and what they contain.
//!
//! Paths are relative to the project root, start with `/`, and use forward
//! slashes, e.g. `/src/main.go`. The filesystem implementation lives in the
//! app crate; [`MemorySource`] is a map-backed tree for tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};

/// Enumerates and reads the files of a project.
pub trait SourceTree: Send + Sync {
    /// Relative paths of every file under `root` passing the extension filter.
    ///
    /// An error here aborts the operation; per-entry problems should be
    /// logged and skipped by the implementation instead.
    fn list_files(&self, root: &str, extensions: &[String]) -> Result<Vec<String>>;

    /// Contents of one file.
    fn read_file(&self, root: &str, path: &str) -> Result<String>;
}

/// Normalise an extension filter: trim, prefix with `.`, lowercase.
///
/// Blank entries are dropped.
pub fn normalize_extensions(extensions: &[String]) -> Vec<String> {
    extensions
        .iter()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .map(|e| {
            if e.starts_with('.') {
                e.to_lowercase()
            } else {
                format!(".{}", e.to_lowercase())
            }
        })
        .collect()
}

/// True if `path` ends with one of the normalised `extensions`, or the
/// filter is empty.
pub fn matches_extension(path: &str, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(dot) => {
            let ext = name[dot..].to_lowercase();
            extensions.iter().any(|e| *e == ext)
        }
        None => false,
    }
}

/// A source tree held in memory. Ignores `root`.
#[derive(Default)]
pub struct MemorySource {
    files: Mutex<BTreeMap<String, String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from `(path, content)` pairs.
    pub fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let map = files
            .into_iter()
            .map(|(path, content)| (path.to_string(), content.to_string()))
            .collect();
        Self {
            files: Mutex::new(map),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>> {
        self.files
            .lock()
            .map_err(|_| anyhow!("memory source lock poisoned"))
    }

    pub fn write(&self, path: &str, content: &str) -> Result<()> {
        self.lock()?.insert(path.to_string(), content.to_string());
        Ok(())
    }

    pub fn remove(&self, path: &str) -> Result<()> {
        self.lock()?.remove(path);
        Ok(())
    }
}

impl SourceTree for MemorySource {
    fn list_files(&self, _root: &str, extensions: &[String]) -> Result<Vec<String>> {
        let normalized = normalize_extensions(extensions);
        Ok(self
            .lock()?
            .keys()
            .filter(|p| matches_extension(p, &normalized))
            .cloned()
            .collect())
    }

    fn read_file(&self, _root: &str, path: &str) -> Result<String> {
        self.lock()?
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("no such file: {}", path))
    }
}
