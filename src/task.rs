//! Expansion of manifest version tables into download tasks.
//!
//! The true extension of an asset is not recorded in the manifest, so every
//! `(entry, hash)` pair is expanded once per candidate extension. At most one
//! of those URLs is expected to exist on the server.

use std::fmt;

use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::manifest::{BaseType, Manifest, ManifestError, VersionEntry};
use crate::uuid::decode_uuid;

/// Extensions tried for every identifier when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    ".json", ".ttf", ".bin", ".png", ".jpg", ".bmp", ".jpeg", ".gif", ".ico", ".tiff", ".webp",
    ".image", ".pvr", ".pkm", ".mp3", ".ogg", ".wav", ".m4a",
];

/// A single candidate file to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    /// Absolute URL of the candidate file.
    pub url: String,
    /// Path of the file inside the bundle archive.
    pub destination_path: String,
    /// Base the task was generated for.
    pub base_type: BaseType,
}

impl fmt::Display for DownloadTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// The server base URL given on the command line is unusable.
#[derive(Debug, Clone, Error)]
#[error("invalid server URL '{url}': {reason}\n  Suggestion: {suggestion}")]
pub struct ServerUrlError {
    /// The rejected URL.
    pub url: String,
    /// Why it was rejected.
    pub reason: String,
    /// How to fix it.
    pub suggestion: &'static str,
}

/// Validates a server base URL and strips trailing slashes.
///
/// # Errors
///
/// Returns [`ServerUrlError`] if the URL does not parse, is not http(s), or
/// has no host.
pub fn normalize_server_url(raw: &str) -> Result<String, ServerUrlError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).map_err(|e| ServerUrlError {
        url: raw.to_string(),
        reason: e.to_string(),
        suggestion: "Pass the game's asset root, e.g. https://example.com/game/v1",
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ServerUrlError {
            url: raw.to_string(),
            reason: format!("scheme '{}' is not supported", parsed.scheme()),
            suggestion: "Use http:// or https:// URLs",
        });
    }
    if parsed.host_str().is_none() {
        return Err(ServerUrlError {
            url: raw.to_string(),
            reason: "URL has no host".to_string(),
            suggestion: "Ensure the URL includes a domain (e.g., example.com)",
        });
    }
    Ok(trimmed.to_string())
}

/// Expands one base of a manifest into download tasks.
///
/// Produces `pairs × extensions.len()` tasks, grouped by pair in table order.
/// `server_base_url` should come from [`normalize_server_url`].
///
/// # Errors
///
/// - [`ManifestError::BaseMissing`] / [`ManifestError::NoVersions`] when
///   the base has nothing to fetch
/// - any error from [`Manifest::version_pairs`] or [`Manifest::uuid_at`]
///   when the version table is malformed
#[instrument(level = "debug", skip(manifest, extensions), fields(bundle = %manifest.name))]
pub fn generate_tasks(
    manifest: &Manifest,
    server_base_url: &str,
    base_type: BaseType,
    extensions: &[String],
) -> Result<Vec<DownloadTask>, ManifestError> {
    let base_path = manifest
        .base_path(base_type)
        .ok_or(ManifestError::BaseMissing { base: base_type })?;
    let pairs = manifest.version_pairs(base_type)?;

    let mut tasks = Vec::with_capacity(pairs.len() * extensions.len());
    for (entry, hash) in pairs {
        let identifier = match entry {
            VersionEntry::Index(index) => decode_uuid(manifest.uuid_at(base_type, index)?),
            VersionEntry::Literal(id) => id,
        };
        let shard: String = identifier.chars().take(2).collect();
        let relative = format!("{}/{base_path}/{shard}/{identifier}.{hash}", manifest.name);

        for ext in extensions {
            let destination_path = format!("{relative}{ext}");
            tasks.push(DownloadTask {
                url: format!("{server_base_url}/assets/{destination_path}"),
                destination_path,
                base_type,
            });
        }
    }

    debug!(base = %base_type, tasks = tasks.len(), "generated download tasks");
    Ok(tasks)
}

/// Returns [`DEFAULT_EXTENSIONS`] as owned strings.
#[must_use]
pub fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|ext| (*ext).to_string()).collect()
}
