//! Filesystem loading of Python sources into [`SourceDocument`]s.
//!
//! Only the binary uses this; library callers build documents themselves.

use anyhow::Result;
use std::path::{Path, PathBuf};

use super::SourceDocument;
use crate::common::is_python_path;

/// Collect `.py` files under each path and read them.
///
/// # Behavior
/// 1. A file argument is taken as-is if it has a `.py` extension
/// 2. A directory argument is walked recursively (symlinks not followed)
/// 3. Paths are sorted and de-duplicated for determinism
/// 4. Unreadable or non-UTF-8 files are skipped with a warning
///
/// # Errors
/// A path that does not exist.
pub fn load_python_files(paths: &[PathBuf]) -> Result<Vec<SourceDocument>> {
    let mut files: Vec<PathBuf> = Vec::new();

    for root in paths {
        if !root.exists() {
            anyhow::bail!("path does not exist: {}", root.display());
        }
        if root.is_file() {
            if is_python_path(root) {
                files.push(root.clone());
            }
            continue;
        }
        for entry in walkdir::WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_map(std::result::Result::ok)
        {
            let path = entry.path();
            if entry.file_type().is_file() && is_python_path(path) {
                files.push(path.to_path_buf());
            }
        }
    }

    files.sort();
    files.dedup();

    let mut documents = Vec::with_capacity(files.len());
    for path in &files {
        match read_document(path) {
            Ok(doc) => documents.push(doc),
            Err(e) => tracing::warn!(path = %path.display(), "skipping file: {}", e),
        }
    }
    tracing::debug!(files = documents.len(), "loaded python sources");
    Ok(documents)
}

fn read_document(path: &Path) -> Result<SourceDocument> {
    let text = std::fs::read_to_string(path)?;
    Ok(SourceDocument::new(path.to_string_lossy(), text))
}
