//! Bundle orchestration: manifest → tasks → retrieval → archive.
//!
//! A bundle is processed in two passes, import base first and native base
//! second. Each pass expands the manifest into candidate URLs, runs them
//! through the [`RetrievalEngine`], and keeps the files that were found. The
//! payload is only touched by the orchestrator after a pass has fully
//! resolved, so no locking is involved.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use uuid2asset_core::bundle::BundleOrchestrator;
//! use uuid2asset_core::download::{EngineConfig, HttpClient, RetrievalEngine};
//! use uuid2asset_core::manifest::Manifest;
//! use uuid2asset_core::task::default_extensions;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = RetrievalEngine::new(EngineConfig::default())?;
//! let fetcher = Arc::new(HttpClient::new()?);
//! let orchestrator =
//!     BundleOrchestrator::new(engine, fetcher, "https://example.com/game", default_extensions())?;
//! let manifest = Manifest::load(Path::new("config.json")).await?;
//! let output = orchestrator.process(&manifest, Path::new(".")).await?;
//! println!("{} files -> {}", output.report.files, output.archive_path.display());
//! # Ok(())
//! # }
//! ```

mod archive;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

pub use archive::{
    ArchiveError, ArchivePayload, archive_file_name, build_zip, write_archive,
};

use crate::download::{
    AssetFetcher, EngineError, LogProgress, ProgressObserver, RetrievalEngine, RetrievalOutcome,
};
use crate::manifest::{BaseType, Manifest, ManifestError};
use crate::task::{DownloadTask, ServerUrlError, generate_tasks, normalize_server_url};

/// Errors that end the processing of one bundle.
#[derive(Debug, Error)]
pub enum BundleError {
    /// The manifest is unusable as a whole.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The server base URL is unusable.
    #[error(transparent)]
    ServerUrl(#[from] ServerUrlError),

    /// No extensions were configured, so no URL can be built.
    #[error("no file extensions configured")]
    NoExtensions,

    /// Neither base produced a single file.
    #[error(
        "no files were found for bundle '{name}'\n  Suggestion: the asset layout of this game is probably not compatible with this tool; check the server URL and manifest"
    )]
    NoFilesFound {
        /// Bundle name.
        name: String,
    },

    /// The retrieval engine stopped (cancellation or bounded-retry failure).
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The archive could not be produced.
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Result of one base pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseSummary {
    /// Base this summary describes.
    pub base_type: BaseType,
    /// Candidate URLs tried.
    pub tasks: usize,
    /// Files found.
    pub found: usize,
    /// Candidates the server reported missing.
    pub not_found: usize,
    /// Retry attempts spent on transient failures.
    pub retried: u64,
    /// Why the base was skipped, if it was.
    pub skipped: Option<String>,
}

impl BaseSummary {
    fn skipped(base_type: BaseType, reason: String) -> Self {
        Self {
            base_type,
            tasks: 0,
            found: 0,
            not_found: 0,
            retried: 0,
            skipped: Some(reason),
        }
    }
}

/// Aggregate result of collecting a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleReport {
    /// Bundle name.
    pub name: String,
    /// One entry per base type, in processing order.
    pub bases: Vec<BaseSummary>,
    /// Files collected across both bases.
    pub files: usize,
    /// Total size of the collected files.
    pub bytes: u64,
    /// True when a base was skipped because its version table was malformed.
    pub degraded: bool,
}

/// Files collected for a bundle, before archiving.
#[derive(Debug)]
pub struct CollectedBundle {
    /// Files keyed by archive path.
    pub payload: ArchivePayload,
    /// Counters.
    pub report: BundleReport,
}

/// A fully processed bundle.
#[derive(Debug)]
pub struct BundleOutput {
    /// Counters.
    pub report: BundleReport,
    /// Where the archive was written.
    pub archive_path: PathBuf,
}

/// Drives a bundle through task generation, retrieval and archiving.
pub struct BundleOrchestrator {
    engine: RetrievalEngine,
    fetcher: Arc<dyn AssetFetcher>,
    server_base_url: String,
    extensions: Vec<String>,
    observer: Arc<dyn ProgressObserver>,
}

impl std::fmt::Debug for BundleOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleOrchestrator")
            .field("engine", &self.engine)
            .field("server_base_url", &self.server_base_url)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

impl BundleOrchestrator {
    /// Creates an orchestrator for one server.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::ServerUrl`] if `server_base_url` is invalid and
    /// [`BundleError::NoExtensions`] if `extensions` is empty.
    pub fn new(
        engine: RetrievalEngine,
        fetcher: Arc<dyn AssetFetcher>,
        server_base_url: &str,
        extensions: Vec<String>,
    ) -> Result<Self, BundleError> {
        if extensions.is_empty() {
            return Err(BundleError::NoExtensions);
        }
        Ok(Self {
            engine,
            fetcher,
            server_base_url: normalize_server_url(server_base_url)?,
            extensions,
            observer: Arc::new(LogProgress),
        })
    }

    /// Replaces the default log-based progress observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Fetches every candidate file of a bundle into memory.
    ///
    /// Invalid or absent bases are skipped and logged; the bundle only fails
    /// when required fields are missing, nothing is found, or the engine stops.
    ///
    /// # Errors
    ///
    /// - [`BundleError::Manifest`] if `uuids` or `versions` is missing
    /// - [`BundleError::NoFilesFound`] if both passes come back empty
    /// - [`BundleError::Engine`] if the run is cancelled or an item fails
    #[instrument(skip(self, manifest), fields(bundle = %manifest.name))]
    pub async fn collect(&self, manifest: &Manifest) -> Result<CollectedBundle, BundleError> {
        manifest.validate()?;
        info!(uuids = manifest.uuid_count(), "processing bundle");

        let mut payload = ArchivePayload::new();
        let mut bases = Vec::with_capacity(BaseType::ALL.len());
        let mut degraded = false;

        for base in BaseType::ALL {
            let tasks = match generate_tasks(manifest, &self.server_base_url, base, &self.extensions)
            {
                Ok(tasks) => tasks,
                Err(e) if e.is_benign_skip() => {
                    info!(base = %base, reason = %e, "skipping base");
                    bases.push(BaseSummary::skipped(base, e.to_string()));
                    continue;
                }
                Err(e) => {
                    warn!(base = %base, error = %e, "skipping base with invalid version table");
                    degraded = true;
                    bases.push(BaseSummary::skipped(base, e.to_string()));
                    continue;
                }
            };

            bases.push(self.run_base(base, &tasks, &mut payload).await?);
        }

        if payload.is_empty() {
            return Err(BundleError::NoFilesFound {
                name: manifest.name.clone(),
            });
        }

        let report = BundleReport {
            name: manifest.name.clone(),
            bases,
            files: payload.len(),
            bytes: payload.total_bytes(),
            degraded,
        };
        Ok(CollectedBundle { payload, report })
    }

    async fn run_base(
        &self,
        base: BaseType,
        tasks: &[DownloadTask],
        payload: &mut ArchivePayload,
    ) -> Result<BaseSummary, BundleError> {
        info!(base = %base, tasks = tasks.len(), "processing base");

        let fetcher = Arc::clone(&self.fetcher);
        let run = self
            .engine
            .run_counting(
                tasks,
                move |task: DownloadTask| {
                    let fetcher = Arc::clone(&fetcher);
                    async move { fetcher.fetch(&task.url).await }
                },
                RetrievalOutcome::is_found,
                self.observer.as_ref(),
            )
            .await?;

        let found = run.stats.found;
        for (task, outcome) in tasks.iter().zip(run.outcomes) {
            if let Some(bytes) = outcome.into_bytes() {
                payload.insert(task.destination_path.clone(), bytes);
            }
        }

        let summary = BaseSummary {
            base_type: base,
            tasks: tasks.len(),
            found,
            not_found: tasks.len() - found,
            retried: run.stats.retried,
            skipped: None,
        };
        info!(
            base = %base,
            found = summary.found,
            not_found = summary.not_found,
            retried = summary.retried,
            "base complete"
        );
        Ok(summary)
    }

    /// Collects a bundle and writes `<name>-bundle.zip` into `output_dir`.
    ///
    /// # Errors
    ///
    /// Everything [`collect`](Self::collect) returns, plus
    /// [`BundleError::Archive`] if the archive cannot be written.
    #[instrument(skip(self, manifest), fields(bundle = %manifest.name, output_dir = %output_dir.display()))]
    pub async fn process(
        &self,
        manifest: &Manifest,
        output_dir: &Path,
    ) -> Result<BundleOutput, BundleError> {
        let collected = self.collect(manifest).await?;
        write_bundle(collected, output_dir).await
    }
}

/// Writes a collected bundle to `output_dir/<name>-bundle.zip`.
///
/// # Errors
///
/// Returns [`BundleError::Archive`] if the archive cannot be built or written.
pub async fn write_bundle(
    collected: CollectedBundle,
    output_dir: &Path,
) -> Result<BundleOutput, BundleError> {
    let CollectedBundle { payload, report } = collected;

    info!(files = report.files, "creating bundle archive");
    let archive_path = output_dir.join(archive_file_name(&report.name));
    let written = write_archive(payload, &archive_path).await?;
    info!(path = %archive_path.display(), bytes = written, "bundle archive written");

    Ok(BundleOutput {
        report,
        archive_path,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::download::{
        DownloadError, EngineConfig, ProgressSnapshot, RetryPolicy, SilentProgress,
    };

    /// Serves fixed bodies by URL; everything else is a 404.
    #[derive(Default)]
    struct FakeFetcher {
        files: HashMap<String, Vec<u8>>,
        /// URLs that fail this many times before answering.
        flaky: Mutex<HashMap<String, u32>>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AssetFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<RetrievalOutcome, DownloadError> {
            self.calls.lock().unwrap().push(url.to_string());
            if let Some(remaining) = self.flaky.lock().unwrap().get_mut(url)
                && *remaining > 0
            {
                *remaining -= 1;
                return Err(DownloadError::http_status(url, 503));
            }
            Ok(self
                .files
                .get(url)
                .map_or(RetrievalOutcome::NotFound, |b| RetrievalOutcome::Found(b.clone())))
        }
    }

    fn engine() -> RetrievalEngine {
        RetrievalEngine::new(EngineConfig {
            concurrency: 16,
            progress_interval: 50,
            retry_policy: RetryPolicy::new(Duration::from_secs(30), Duration::from_secs(5)),
        })
        .unwrap()
    }

    fn orchestrator(fetcher: Arc<FakeFetcher>, extensions: &[&str]) -> BundleOrchestrator {
        BundleOrchestrator::new(
            engine(),
            fetcher,
            "http://assets.test/game/",
            extensions.iter().map(|e| (*e).to_string()).collect(),
        )
        .unwrap()
        .with_observer(Arc::new(SilentProgress))
    }

    fn manifest() -> Manifest {
        serde_json::from_value(json!({
            "name": "main",
            "importBase": "import",
            "nativeBase": "native",
            "uuids": ["AAAAAAAAAAAAAAAAAAAAAA"],
            "versions": {
                "import": [0, "deadbeef"],
                "native": ["0e95a9f8d", "77aa1"]
            }
        }))
        .unwrap()
    }

    const IMPORT_URL: &str =
        "http://assets.test/game/assets/main/import/AA/AA000000-0000-0000-0000-000000000000.deadbeef.bin";

    #[tokio::test(start_paused = true)]
    async fn test_collect_single_found_file() {
        let fetcher = Arc::new(FakeFetcher {
            files: HashMap::from([(IMPORT_URL.to_string(), b"bytes".to_vec())]),
            ..FakeFetcher::default()
        });
        let collected = orchestrator(Arc::clone(&fetcher), &[".bin"])
            .collect(&manifest())
            .await
            .unwrap();

        assert_eq!(collected.payload.len(), 1);
        assert_eq!(
            collected
                .payload
                .get("main/import/AA/AA000000-0000-0000-0000-000000000000.deadbeef.bin"),
            Some(&b"bytes"[..])
        );
        let report = collected.report;
        assert_eq!(report.files, 1);
        assert!(!report.degraded);
        assert_eq!(report.bases[0].base_type, BaseType::Import);
        assert_eq!((report.bases[0].found, report.bases[0].not_found), (1, 0));
        assert_eq!((report.bases[1].found, report.bases[1].not_found), (0, 1));
    }

    #[derive(Default)]
    struct FinishedRuns(Mutex<Vec<ProgressSnapshot>>);

    impl ProgressObserver for FinishedRuns {
        fn on_progress(&self, _snapshot: &ProgressSnapshot) {}

        fn on_finish(&self, snapshot: &ProgressSnapshot) {
            self.0.lock().unwrap().push(snapshot.clone());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_counts_only_found_files() {
        let fetcher = Arc::new(FakeFetcher {
            files: HashMap::from([(IMPORT_URL.to_string(), b"bytes".to_vec())]),
            ..FakeFetcher::default()
        });
        let runs = Arc::new(FinishedRuns::default());
        let observer: Arc<dyn ProgressObserver> = runs.clone();
        let collected = orchestrator(Arc::clone(&fetcher), &[".bin", ".png"])
            .with_observer(observer)
            .collect(&manifest())
            .await
            .unwrap();

        let finished: Vec<(usize, usize)> = runs
            .0
            .lock()
            .unwrap()
            .iter()
            .map(|s| (s.processed, s.found))
            .collect();
        // Import then native, two candidate files each.
        assert_eq!(finished, vec![(2, 1), (2, 0)]);
        assert_eq!(collected.report.bases[0].found, 1);
        assert_eq!(collected.report.bases[0].not_found, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_not_found_reports_no_files_without_retry() {
        let fetcher = Arc::new(FakeFetcher::default());
        let extensions = [".json", ".png", ".bin"];
        let err = orchestrator(Arc::clone(&fetcher), &extensions)
            .collect(&manifest())
            .await
            .unwrap_err();

        assert!(matches!(err, BundleError::NoFilesFound { ref name } if name == "main"));
        // Two pairs × three extensions, each fetched exactly once.
        let calls = fetcher.calls.lock().unwrap();
        assert_eq!(calls.len(), 6);
        let unique: std::collections::HashSet<_> = calls.iter().collect();
        assert_eq!(unique.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried_until_found() {
        let fetcher = Arc::new(FakeFetcher {
            files: HashMap::from([(IMPORT_URL.to_string(), b"late".to_vec())]),
            flaky: Mutex::new(HashMap::from([(IMPORT_URL.to_string(), 3)])),
            ..FakeFetcher::default()
        });
        let collected = orchestrator(Arc::clone(&fetcher), &[".bin"])
            .collect(&manifest())
            .await
            .unwrap();

        assert_eq!(collected.report.bases[0].retried, 3);
        assert_eq!(collected.payload.total_bytes(), 4);
        let calls = fetcher.calls.lock().unwrap();
        assert_eq!(calls.iter().filter(|u| *u == IMPORT_URL).count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_required_fields_fails_bundle() {
        let fetcher = Arc::new(FakeFetcher::default());
        let manifest: Manifest =
            serde_json::from_value(json!({ "name": "broken", "versions": {} })).unwrap();
        let err = orchestrator(Arc::clone(&fetcher), &[".bin"])
            .collect(&manifest)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BundleError::Manifest(ManifestError::MissingField { field: "uuids", .. })
        ));
        assert!(fetcher.calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_base_is_skipped_and_marks_degraded() {
        let fetcher = Arc::new(FakeFetcher {
            files: HashMap::from([(
                "http://assets.test/game/assets/main/native/0e/0e95a9f8d.77aa1.png".to_string(),
                b"png".to_vec(),
            )]),
            ..FakeFetcher::default()
        });
        let manifest: Manifest = serde_json::from_value(json!({
            "name": "main",
            "importBase": "import",
            "nativeBase": "native",
            "uuids": [],
            "versions": {
                "import": [0, "deadbeef", 1],
                "native": ["0e95a9f8d", "77aa1"]
            }
        }))
        .unwrap();

        let collected = orchestrator(fetcher, &[".png"])
            .collect(&manifest)
            .await
            .unwrap();

        assert!(collected.report.degraded);
        assert!(collected.report.bases[0].skipped.is_some());
        assert_eq!(collected.report.bases[1].found, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_native_base_is_benign() {
        let fetcher = Arc::new(FakeFetcher {
            files: HashMap::from([(IMPORT_URL.to_string(), b"x".to_vec())]),
            ..FakeFetcher::default()
        });
        let mut manifest = manifest();
        manifest.native_base = None;

        let collected = orchestrator(fetcher, &[".bin"]).collect(&manifest).await.unwrap();
        assert!(!collected.report.degraded);
        assert!(collected.report.bases[1].skipped.is_some());
    }

    #[tokio::test]
    async fn test_process_writes_named_archive() {
        let dir = tempfile::TempDir::new().unwrap();
        let fetcher = Arc::new(FakeFetcher {
            files: HashMap::from([(IMPORT_URL.to_string(), b"bytes".to_vec())]),
            ..FakeFetcher::default()
        });
        let output = orchestrator(fetcher, &[".bin"])
            .process(&manifest(), dir.path())
            .await
            .unwrap();

        assert_eq!(output.archive_path, dir.path().join("main-bundle.zip"));
        assert!(output.archive_path.exists());
        assert_eq!(output.report.files, 1);
    }

    #[test]
    fn test_new_rejects_empty_extensions_and_bad_url() {
        let fetcher: Arc<dyn AssetFetcher> = Arc::new(FakeFetcher::default());
        assert!(matches!(
            BundleOrchestrator::new(engine(), Arc::clone(&fetcher), "http://h", Vec::new()),
            Err(BundleError::NoExtensions)
        ));
        assert!(matches!(
            BundleOrchestrator::new(engine(), fetcher, "nope", vec![".bin".into()]),
            Err(BundleError::ServerUrl(_))
        ));
    }
}
