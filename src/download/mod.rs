//! Concurrent retrieval of candidate asset files.
//!
//! This module provides the generic [`RetrievalEngine`] (bounded concurrency,
//! per-attempt timeout, fixed-delay unbounded retry, batched progress) and the
//! HTTP [`HttpClient`] that serves as its processor for asset URLs.
//!
//! # Features
//!
//! - At most `concurrency` requests in flight (400 by default)
//! - 404 is a terminal [`RetrievalOutcome::NotFound`], never retried
//! - Timeouts, network errors and other statuses are retried every 5s
//! - Cooperative cancellation through a `CancellationToken`
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use uuid2asset_core::download::{
//!     EngineConfig, HttpClient, LogProgress, RetrievalEngine, RetrievalOutcome,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(HttpClient::new()?);
//! let engine = RetrievalEngine::new(EngineConfig::default())?;
//! let urls = vec!["https://example.com/assets/main/import/AA/x.json".to_string()];
//! let run = engine
//!     .run_counting(
//!         &urls,
//!         move |url: String| {
//!             let client = Arc::clone(&client);
//!             async move { client.get(&url).await }
//!         },
//!         RetrievalOutcome::is_found,
//!         &LogProgress,
//!     )
//!     .await?;
//! println!("found: {} of {}", run.stats.found, run.stats.processed);
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod engine;
mod error;
mod outcome;
mod progress;
mod retry;

pub use client::{AssetFetcher, HttpClient};
pub use constants::{
    DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_CONCURRENCY, DEFAULT_PROGRESS_INTERVAL, DEFAULT_RETRY_DELAY,
    MAX_CONCURRENCY, MIN_CONCURRENCY,
};
pub use engine::{EngineConfig, EngineError, EngineRun, RetrievalEngine, RunStats};
pub use error::DownloadError;
pub use outcome::RetrievalOutcome;
pub use progress::{LogProgress, ProgressObserver, ProgressSnapshot, SilentProgress};
pub use retry::{AttemptError, Attempted, RetryError, RetryPolicy, retry_with_timeout};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
