//! Pre-built corpora and temporary corpus files.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Three documents packed as `title\n\ntext`, the last one with a trailing
/// delimiter.
///
/// # Example
///
/// ```
/// use ironcorpus::testing::sample_packed_corpus;
///
/// assert_eq!(sample_packed_corpus().len(), 3);
/// ```
#[must_use]
pub fn sample_packed_corpus() -> Vec<String> {
    vec![
        r#"{"id": "doc1", "contents": "Vitamin D\n\nVitamin D supports bone health."}"#.to_string(),
        r#"{"id": "doc2", "contents": "Sleep\n\nAdults need seven hours of sleep."}"#.to_string(),
        r#"{"docid": 3, "contents": "Exercise\n\nWalking lowers blood pressure.\n\n"}"#.to_string(),
    ]
}

/// The documents of [`sample_packed_corpus`] with explicit `title`/`text` keys.
#[must_use]
pub fn sample_explicit_corpus() -> Vec<String> {
    vec![
        r#"{"id": "doc1", "title": "Vitamin D", "text": "Vitamin D supports bone health."}"#.to_string(),
        r#"{"id": "doc2", "title": "Sleep", "text": "Adults need seven hours of sleep."}"#.to_string(),
        r#"{"id": "3", "title": "Exercise", "text": "Walking lowers blood pressure."}"#.to_string(),
    ]
}

/// `n` single-field documents `d0..d{n-1}` with text `"document i"`.
#[must_use]
pub fn numbered_corpus(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| format!(r#"{{"id": "d{i}", "contents": "document {i}"}}"#))
        .collect()
}

/// Write `lines` to `path`, one per line, creating parent directories.
///
/// # Errors
///
/// Returns an error if the file or its parents cannot be created.
pub fn write_corpus<S: AsRef<str>>(path: impl AsRef<Path>, lines: &[S]) -> std::io::Result<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path)?;
    for line in lines {
        file.write_all(line.as_ref().as_bytes())?;
        file.write_all(b"\n")?;
    }
    file.flush()?;
    Ok(path.to_path_buf())
}

/// A corpus file inside a temporary directory, deleted on drop.
pub struct TempCorpus {
    dir: TempDir,
    path: PathBuf,
}

impl TempCorpus {
    /// Write `lines` to `corpus.jsonl` in a fresh temporary directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub fn with_lines<S: AsRef<str>>(lines: &[S]) -> std::io::Result<Self> {
        let dir = TempDir::new()?;
        let path = write_corpus(dir.path().join("corpus.jsonl"), lines)?;
        Ok(Self { dir, path })
    }

    /// Path of the corpus file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The temporary directory, usable for outputs next to the corpus.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}
