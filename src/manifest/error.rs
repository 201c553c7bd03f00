//! Error types for manifest loading and interpretation.

use std::path::PathBuf;

use thiserror::Error;

use super::BaseType;

/// Errors raised while reading a manifest or expanding its version tables.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("failed to read manifest {path}: {source}")]
    Read {
        /// Path of the manifest file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest file is not valid JSON or lacks the `name` field.
    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        /// Path of the manifest file.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A required top-level field is absent.
    #[error("manifest '{name}' is missing required field `{field}`")]
    MissingField {
        /// Manifest name.
        name: String,
        /// Name of the missing field.
        field: &'static str,
    },

    /// No base path is declared for this base type.
    #[error("{base} base not found in manifest")]
    BaseMissing {
        /// Affected base type.
        base: BaseType,
    },

    /// The version table for this base type is absent or empty.
    #[error("no versions found for {base} base")]
    NoVersions {
        /// Affected base type.
        base: BaseType,
    },

    /// The version table does not consist of entry/hash pairs.
    #[error("{base} version table has odd length {len}; expected entry/hash pairs")]
    OddVersionCount {
        /// Affected base type.
        base: BaseType,
        /// Length of the version table.
        len: usize,
    },

    /// A numeric entry points past the end of `uuids`.
    #[error("{base} version entry references uuid index {index}, but only {len} uuids exist")]
    UuidIndexOutOfRange {
        /// Affected base type.
        base: BaseType,
        /// Referenced index.
        index: u64,
        /// Number of uuids in the manifest.
        len: usize,
    },

    /// An entry or hash has an unsupported JSON type.
    #[error("{base} version table has unsupported value {value} at position {position}")]
    InvalidEntry {
        /// Affected base type.
        base: BaseType,
        /// Position in the flat version table.
        position: usize,
        /// The offending value, rendered as JSON.
        value: String,
    },
}

impl ManifestError {
    /// Returns true when the error only means "nothing to do for this base".
    ///
    /// Manifests routinely omit one of the two bases; that is reported but does
    /// not count against the bundle.
    #[must_use]
    pub fn is_benign_skip(&self) -> bool {
        matches!(self, Self::BaseMissing { .. } | Self::NoVersions { .. })
    }
}
