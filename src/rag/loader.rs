//! Directory walking and per-file ingestion outcomes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read file: {0}")]
    Read(#[from] io::Error),
    #[error("file is not valid UTF-8")]
    Encoding,
    #[error("file has no text to index")]
    Empty,
    #[error("embedding failed: {0}")]
    Embedding(String),
    #[error("vector store write failed: {0}")]
    Store(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestedFile {
    pub path: String,
    pub chunks: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub path: String,
    pub reason: String,
}

/// Outcome of one ingestion run. Every candidate file lands in exactly one list.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub succeeded: Vec<IngestedFile>,
    pub failed: Vec<FailedFile>,
}

impl IngestReport {
    pub fn record(&mut self, path: &Path, outcome: Result<usize, IngestError>) {
        let shown = path.to_string_lossy().to_string();
        match outcome {
            Ok(chunks) => {
                tracing::info!("SUCCESS: {} ({} chunks)", shown, chunks);
                self.succeeded.push(IngestedFile {
                    path: shown,
                    chunks,
                });
            }
            Err(err) => {
                tracing::warn!("FAILED: {} by ({})", shown, err);
                self.failed.push(FailedFile {
                    path: shown,
                    reason: err.to_string(),
                });
            }
        }
    }

    pub fn total_chunks(&self) -> usize {
        self.succeeded.iter().map(|f| f.chunks).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Recursively lists files under `dir` whose extension is in `extensions`
/// (case-insensitive, without the leading dot). Sorted for stable reports.
pub fn collect_files(dir: &Path, extensions: &[String]) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(dir, extensions, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk(dir: &Path, extensions: &[String], files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            if let Err(err) = walk(&path, extensions, files) {
                tracing::warn!("Skipping unreadable directory {}: {}", path.display(), err);
            }
        } else if file_type.is_file() && has_allowed_extension(&path, extensions) {
            files.push(path);
        }
    }
    Ok(())
}

pub fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
}

/// Reads a file as UTF-8 text.
pub fn read_document(path: &Path) -> Result<String, IngestError> {
    let bytes = fs::read(path)?;
    String::from_utf8(bytes).map_err(|_| IngestError::Encoding)
}
