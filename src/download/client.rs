//! HTTP client wrapper for fetching asset files.
//!
//! This module provides the [`HttpClient`] which performs a single GET per
//! call and classifies the response into a [`RetrievalOutcome`] or a
//! retryable [`DownloadError`], and the [`AssetFetcher`] seam used by the
//! bundle orchestrator.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, trace};

use super::constants::CONNECT_TIMEOUT_SECS;
use super::error::DownloadError;
use super::outcome::RetrievalOutcome;
use crate::user_agent;

/// Something that can fetch a candidate asset URL.
///
/// Implementations must return [`RetrievalOutcome::NotFound`] only when the
/// remote side confirms the file does not exist; every other failure is an
/// error and will be retried.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Fetches `url` once.
    async fn fetch(&self, url: &str) -> Result<RetrievalOutcome, DownloadError>;
}

/// HTTP client for fetching asset files into memory.
///
/// Created once per run and cloned cheaply into every task, sharing the
/// underlying connection pool.
///
/// The client has no overall request timeout; attempts are bounded by the
/// retry policy, which drops the request future (and its connection) when
/// the attempt deadline passes.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client with the default connect timeout.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] if the TLS backend or system
    /// configuration cannot be initialised.
    pub fn new() -> Result<Self, DownloadError> {
        Self::with_connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
    }

    /// Creates a client with an explicit connect timeout.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] if the client cannot be built.
    #[instrument(level = "debug")]
    pub fn with_connect_timeout(connect_timeout: Duration) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .map_err(|source| DownloadError::ClientBuild { source })?;
        Ok(Self { client })
    }

    /// Fetches `url` and reads the whole body.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::HttpStatus`] for any non-2xx status other than 404
    /// - [`DownloadError::Network`] / [`DownloadError::Timeout`] if the
    ///   request or body read fails
    #[instrument(level = "trace", skip(self))]
    pub async fn get(&self, url: &str) -> Result<RetrievalOutcome, DownloadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::from_reqwest(url, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            trace!("not found");
            return Ok(RetrievalOutcome::NotFound);
        }
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DownloadError::from_reqwest(url, e))?;
        debug!(url, bytes = body.len(), "asset found");
        Ok(RetrievalOutcome::Found(body.to_vec()))
    }
}

#[async_trait]
impl AssetFetcher for HttpClient {
    async fn fetch(&self, url: &str) -> Result<RetrievalOutcome, DownloadError> {
        self.get(url).await
    }
}
