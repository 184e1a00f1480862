//! Corpus file access: path resolution and transparent decompression.

pub mod compression;
pub mod glob;

pub use compression::{Codec, open_lines};
pub use glob::{expand_glob, resolve_corpus_files};
