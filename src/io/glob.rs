//! Resolving a corpus path into the ordered list of files it denotes.
//!
//! A corpus path may be:
//! - a single file, loaded on its own;
//! - a directory, whose regular, non-hidden files are loaded in sorted
//!   file-name order (sub-directories are not descended into);
//! - a glob pattern such as `corpus/*.jsonl` or `shards/**/*.jsonl.gz`,
//!   whose matching files are loaded in sorted path order.
//!
//! Sorting makes the load order, and therefore every batch, identical across
//! runs and platforms.

use glob::glob;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CorpusError, CorpusResult};

/// Characters that make a path a glob pattern rather than a literal path.
const GLOB_META: [char; 3] = ['*', '?', '['];

/// Return `true` if `path` contains glob metacharacters.
pub fn is_pattern(path: &str) -> bool {
    path.contains(GLOB_META)
}

/// Expand a glob pattern into sorted matching files.
///
/// # Errors
/// [`CorpusError::InvalidConfig`] for a malformed pattern and
/// [`CorpusError::Io`] when a matched entry cannot be read.
pub fn expand_glob(pattern: &str) -> CorpusResult<Vec<PathBuf>> {
    let entries = glob(pattern)
        .map_err(|e| CorpusError::InvalidConfig(format!("invalid glob pattern {pattern}: {e}")))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            CorpusError::io(path, e.into_error())
        })?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// List the regular files of a directory in sorted order, skipping dotfiles.
///
/// # Errors
/// [`CorpusError::Io`] if the directory cannot be read.
pub fn list_dir(dir: &Path) -> CorpusResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| CorpusError::io(dir, e))? {
        let entry = entry.map_err(|e| CorpusError::io(dir, e))?;
        let path = entry.path();
        let hidden = entry.file_name().to_str().is_some_and(|n| n.starts_with('.'));
        if !hidden && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Resolve a corpus path (file, directory, or pattern) to its files.
///
/// # Errors
/// [`CorpusError::CorpusNotFound`] if the path is none of the three, or a
/// pattern matches no file.
pub fn resolve_corpus_files(path: impl AsRef<Path>) -> CorpusResult<Vec<PathBuf>> {
    let path = path.as_ref();
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if path.is_dir() {
        return list_dir(path);
    }
    if let Some(pattern) = path.to_str()
        && is_pattern(pattern)
    {
        let files = expand_glob(pattern)?;
        if !files.is_empty() {
            return Ok(files);
        }
    }
    Err(CorpusError::CorpusNotFound {
        path: path.to_path_buf(),
    })
}
