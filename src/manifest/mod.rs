//! Asset bundle manifests.
//!
//! A manifest (`config.<hash>.json` in a deployed game) names the bundle and
//! lists, per base type, the packed UUIDs and content hashes needed to locate
//! every asset file on the server. Only the fields the downloader reads are
//! modelled; everything else is ignored.
//!
//! # Example
//!
//! ```
//! use uuid2asset_core::manifest::{BaseType, Manifest};
//!
//! let manifest: Manifest = serde_json::from_str(
//!     r#"{
//!         "name": "main",
//!         "importBase": "import",
//!         "nativeBase": "native",
//!         "uuids": ["AAAAAAAAAAAAAAAAAAAAAA"],
//!         "versions": { "import": [0, "deadbeef"], "native": [] }
//!     }"#,
//! ).unwrap();
//!
//! assert_eq!(manifest.base_path(BaseType::Import), Some("import"));
//! assert_eq!(manifest.versions_for(BaseType::Import).map(<[_]>::len), Some(2));
//! ```

mod error;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

pub use error::ManifestError;

/// One of the two asset categories carried by a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    /// Serialized asset descriptors (`importBase`).
    Import,
    /// Raw asset payloads such as textures and audio (`nativeBase`).
    Native,
}

impl BaseType {
    /// Base types in processing order.
    pub const ALL: [BaseType; 2] = [BaseType::Import, BaseType::Native];

    /// Returns the key used in the manifest's `versions` table.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Native => "native",
        }
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The parts of a bundle manifest the downloader relies on.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Bundle name; namespaces every URL and archive path.
    pub name: String,
    /// Packed UUIDs, referenced by index from the version tables.
    #[serde(default)]
    pub uuids: Option<Vec<String>>,
    /// Flat `[entry, hash, entry, hash, ...]` tables keyed by base type.
    #[serde(default)]
    pub versions: Option<HashMap<String, Vec<Value>>>,
    /// Path segment for the import base.
    #[serde(default)]
    pub import_base: Option<String>,
    /// Path segment for the native base.
    #[serde(default)]
    pub native_base: Option<String>,
}

/// A decoded `entry` slot of a version table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionEntry {
    /// Index into [`Manifest::uuids`].
    Index(u64),
    /// Identifier given directly.
    Literal(String),
}

impl Manifest {
    /// Reads and parses a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Read`] if the file cannot be read and
    /// [`ManifestError::Parse`] if it is not a valid manifest.
    #[instrument(level = "debug", fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, ManifestError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ManifestError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let manifest: Self = serde_json::from_str(&raw).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(name = %manifest.name, "manifest loaded");
        Ok(manifest)
    }

    /// Checks that the fields every bundle needs are present.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::MissingField`] naming the first absent field.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.uuids.is_none() {
            return Err(self.missing("uuids"));
        }
        if self.versions.is_none() {
            return Err(self.missing("versions"));
        }
        Ok(())
    }

    fn missing(&self, field: &'static str) -> ManifestError {
        ManifestError::MissingField {
            name: self.name.clone(),
            field,
        }
    }

    /// Returns the number of packed UUIDs.
    #[must_use]
    pub fn uuid_count(&self) -> usize {
        self.uuids.as_ref().map_or(0, Vec::len)
    }

    /// Returns the server path segment for a base type, if declared and non-empty.
    #[must_use]
    pub fn base_path(&self, base: BaseType) -> Option<&str> {
        let path = match base {
            BaseType::Import => self.import_base.as_deref(),
            BaseType::Native => self.native_base.as_deref(),
        };
        path.filter(|p| !p.is_empty())
    }

    /// Returns the raw version table for a base type.
    #[must_use]
    pub fn versions_for(&self, base: BaseType) -> Option<&[Value]> {
        self.versions
            .as_ref()
            .and_then(|versions| versions.get(base.as_str()))
            .map(Vec::as_slice)
    }

    /// Splits a base's version table into `(entry, hash)` pairs.
    ///
    /// # Errors
    ///
    /// - [`ManifestError::NoVersions`] if the table is absent or empty
    /// - [`ManifestError::OddVersionCount`] if it is not made of pairs
    /// - [`ManifestError::InvalidEntry`] for values of an unsupported type
    pub fn version_pairs(&self, base: BaseType) -> Result<Vec<(VersionEntry, String)>, ManifestError> {
        let table = self
            .versions_for(base)
            .filter(|table| !table.is_empty())
            .ok_or(ManifestError::NoVersions { base })?;

        if table.len() % 2 != 0 {
            return Err(ManifestError::OddVersionCount {
                base,
                len: table.len(),
            });
        }

        table
            .chunks_exact(2)
            .enumerate()
            .map(|(pair_index, pair)| {
                let position = pair_index * 2;
                let entry = parse_entry(&pair[0]).ok_or_else(|| invalid(base, position, &pair[0]))?;
                let hash =
                    parse_hash(&pair[1]).ok_or_else(|| invalid(base, position + 1, &pair[1]))?;
                Ok((entry, hash))
            })
            .collect()
    }

    /// Looks up the packed UUID at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::UuidIndexOutOfRange`] if there is no such UUID.
    pub fn uuid_at(&self, base: BaseType, index: u64) -> Result<&str, ManifestError> {
        let uuids = self.uuids.as_deref().unwrap_or_default();
        usize::try_from(index)
            .ok()
            .and_then(|i| uuids.get(i))
            .map(String::as_str)
            .ok_or(ManifestError::UuidIndexOutOfRange {
                base,
                index,
                len: uuids.len(),
            })
    }
}

fn invalid(base: BaseType, position: usize, value: &Value) -> ManifestError {
    ManifestError::InvalidEntry {
        base,
        position,
        value: value.to_string(),
    }
}

fn parse_entry(value: &Value) -> Option<VersionEntry> {
    match value {
        Value::Number(n) => n.as_u64().map(VersionEntry::Index),
        Value::String(s) if !s.is_empty() => Some(VersionEntry::Literal(s.clone())),
        _ => None,
    }
}

fn parse_hash(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
