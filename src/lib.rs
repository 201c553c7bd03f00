//! uuid2asset core library
//!
//! This library rebuilds downloadable asset bundles from a game server's
//! content tree. A manifest lists packed identifiers and version hashes; the
//! library decodes the identifiers, expands every candidate URL, fetches them
//! concurrently, and packs whatever exists into one zip archive per bundle.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`uuid`] - Decoder for packed 22-character identifiers
//! - [`manifest`] - Bundle manifest model and validation
//! - [`task`] - Expansion of version tables into candidate URLs
//! - [`download`] - Bounded-concurrency retrieval engine and HTTP client
//! - [`bundle`] - Per-bundle orchestration and zip output

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bundle;
pub mod download;
pub mod manifest;
pub mod task;
pub mod uuid;

mod user_agent;

// Re-export commonly used types
pub use bundle::{BundleError, BundleOrchestrator, BundleOutput, BundleReport};
pub use download::{
    AssetFetcher, DEFAULT_CONCURRENCY, DownloadError, EngineConfig, EngineError, HttpClient,
    ProgressObserver, ProgressSnapshot, RetrievalEngine, RetrievalOutcome, RetryPolicy,
};
pub use manifest::{BaseType, Manifest, ManifestError};
pub use task::{DownloadTask, default_extensions, generate_tasks};
pub use uuid::decode_uuid;
