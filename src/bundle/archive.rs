//! Zip packaging of retrieved assets.

use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Errors from building or persisting a bundle archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The zip encoder failed.
    #[error("failed to build archive: {source}")]
    Build {
        /// Underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },

    /// The archive could not be written to disk.
    #[error("failed to write archive {path}: {source}")]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The blocking build task did not complete.
    #[error("archive build task failed: {0}")]
    Task(String),
}

/// Retrieved files keyed by their path inside the archive.
///
/// Entries are kept sorted so archives are reproducible for the same input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchivePayload {
    entries: BTreeMap<String, Vec<u8>>,
}

impl ArchivePayload {
    /// Creates an empty payload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file, replacing any earlier file at the same path.
    pub fn insert(&mut self, path: impl Into<String>, bytes: Vec<u8>) {
        self.entries.insert(path.into(), bytes);
    }

    /// Returns the number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no file was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the bytes stored at `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    /// Returns the archive paths in order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the summed size of all files.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.entries.values().map(|b| b.len() as u64).sum()
    }
}

/// Encodes the payload as an in-memory zip archive.
///
/// # Errors
///
/// Returns [`ArchiveError::Build`] if the zip encoder fails.
pub fn build_zip(payload: &ArchivePayload) -> Result<Vec<u8>, ArchiveError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (path, bytes) in &payload.entries {
        writer
            .start_file(path.as_str(), options)
            .map_err(|source| ArchiveError::Build { source })?;
        writer.write_all(bytes).map_err(|e| ArchiveError::Build {
            source: zip::result::ZipError::Io(e),
        })?;
    }

    let cursor = writer
        .finish()
        .map_err(|source| ArchiveError::Build { source })?;
    Ok(cursor.into_inner())
}

/// Returns the archive file name for a bundle.
#[must_use]
pub fn archive_file_name(bundle_name: &str) -> String {
    format!("{bundle_name}-bundle.zip")
}

/// Builds the archive off the async runtime and writes it to `path`.
///
/// # Errors
///
/// Returns [`ArchiveError::Build`] / [`ArchiveError::Task`] if encoding fails
/// and [`ArchiveError::Write`] if the file cannot be written.
#[instrument(skip(payload), fields(files = payload.len(), path = %path.display()))]
pub async fn write_archive(payload: ArchivePayload, path: &Path) -> Result<u64, ArchiveError> {
    let bytes = tokio::task::spawn_blocking(move || build_zip(&payload))
        .await
        .map_err(|e| ArchiveError::Task(e.to_string()))??;
    debug!(bytes = bytes.len(), "archive encoded");

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| ArchiveError::Write {
                path: path.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::write(path, &bytes)
        .await
        .map_err(|source| ArchiveError::Write {
            path: path.to_path_buf(),
            source,
        })?;

    info!(bytes = bytes.len(), "archive written");
    Ok(bytes.len() as u64)
}
