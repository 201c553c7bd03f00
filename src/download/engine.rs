//! Bounded-concurrency retrieval engine.
//!
//! The engine runs an arbitrary async processor over a list of work items.
//! At most `concurrency` processor calls are in flight at any time: the
//! driver keeps a [`JoinSet`] topped up to the limit and only spawns the next
//! item when a running one finishes. Every item goes through
//! [`retry_with_timeout`], so transient failures never reach the caller.
//!
//! Progress is reported to a [`ProgressObserver`] every `progress_interval`
//! completions and once more at the end. Each item runs inside an info-level
//! `item` span, so retry warnings name the item they belong to.
//!
//! # Example
//!
//! ```no_run
//! use uuid2asset_core::download::{EngineConfig, LogProgress, RetrievalEngine};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = RetrievalEngine::new(EngineConfig::default())?;
//! let items = vec![1u32, 2, 3];
//! let run = engine
//!     .run(&items, |n| async move { Ok::<_, std::io::Error>(n * 2) }, &LogProgress)
//!     .await?;
//! assert_eq!(run.outcomes, vec![2, 4, 6]);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use super::constants::{
    DEFAULT_CONCURRENCY, DEFAULT_PROGRESS_INTERVAL, MAX_CONCURRENCY, MIN_CONCURRENCY,
};
use super::progress::{ProgressObserver, ProgressSnapshot};
use super::retry::{RetryError, RetryPolicy, retry_with_timeout};

/// Error type for retrieval engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Progress interval of zero.
    #[error("invalid progress interval 0: must be at least 1")]
    InvalidProgressInterval,

    /// The run was cancelled before all items completed.
    #[error("run cancelled after {processed} of {total} items")]
    Cancelled {
        /// Items that completed before cancellation.
        processed: usize,
        /// Items in the run.
        total: usize,
    },

    /// An item failed terminally (only possible with a bounded retry policy).
    #[error("item {item} failed: {message}")]
    ItemFailed {
        /// Display form of the failed item.
        item: String,
        /// Terminal error message.
        message: String,
    },

    /// A worker task panicked.
    #[error("worker task panicked: {0}")]
    WorkerPanicked(String),
}

/// Tunables for a [`RetrievalEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum processor calls in flight.
    pub concurrency: usize,
    /// Completions between progress reports.
    pub progress_interval: usize,
    /// Retry behaviour applied to every item.
    pub retry_policy: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            retry_policy: RetryPolicy::default(),
        }
    }
}

/// Counters from one [`RetrievalEngine::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunStats {
    /// Items that reached a terminal outcome.
    pub processed: usize,
    /// Processed items the caller's predicate counted as found.
    pub found: usize,
    /// Retry attempts across all items.
    pub retried: u64,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

/// Ordered outcomes plus counters.
#[derive(Debug)]
pub struct EngineRun<O> {
    /// One outcome per input item, in input order.
    pub outcomes: Vec<O>,
    /// Run counters.
    pub stats: RunStats,
}

/// Retrieval engine with bounded concurrency and unbounded retry.
///
/// # Concurrency Model
///
/// - Each item runs in its own Tokio task
/// - No more than `concurrency` tasks exist at once
/// - Outcomes are written into per-index slots by the driver, never by workers
/// - Cancellation stops scheduling, and running items return at their next
///   attempt boundary or during their retry delay
#[derive(Debug, Clone)]
pub struct RetrievalEngine {
    config: EngineConfig,
    cancel: CancellationToken,
}

impl RetrievalEngine {
    /// Creates a new engine.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if the concurrency is outside
    /// the valid range, or [`EngineError::InvalidProgressInterval`] for a zero
    /// interval.
    #[instrument(level = "debug", skip(config), fields(concurrency = config.concurrency))]
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&config.concurrency) {
            return Err(EngineError::InvalidConcurrency {
                value: config.concurrency,
            });
        }
        if config.progress_interval == 0 {
            return Err(EngineError::InvalidProgressInterval);
        }

        debug!(
            concurrency = config.concurrency,
            progress_interval = config.progress_interval,
            max_attempts = ?config.retry_policy.max_attempts(),
            attempt_timeout_ms = config.retry_policy.attempt_timeout().as_millis(),
            retry_delay_ms = config.retry_policy.retry_delay().as_millis(),
            "creating retrieval engine"
        );

        Ok(Self {
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Attaches a cancellation token observed by every run.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.config.concurrency
    }

    /// Runs `processor` over every item and returns outcomes in input order.
    ///
    /// Every successful outcome counts as found. Use
    /// [`run_counting`](Self::run_counting) when some outcomes are misses.
    ///
    /// # Errors
    ///
    /// Same as [`run_counting`](Self::run_counting).
    pub async fn run<T, O, E, F, Fut>(
        &self,
        items: &[T],
        processor: F,
        observer: &dyn ProgressObserver,
    ) -> Result<EngineRun<O>, EngineError>
    where
        T: Clone + fmt::Display + Send + Sync + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, E>> + Send + 'static,
        O: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        self.run_counting(items, processor, |_: &O| true, observer)
            .await
    }

    /// Runs `processor` over every item and returns outcomes in input order,
    /// counting the outcomes for which `is_found` holds.
    ///
    /// Items are cloned into their worker task; the processor is shared. A
    /// processor error or timeout is retried per the engine's
    /// [`RetryPolicy`]. `is_found` runs on the driving task as each item
    /// completes, and its count feeds [`RunStats::found`] and every
    /// [`ProgressSnapshot`].
    ///
    /// # Errors
    ///
    /// - [`EngineError::Cancelled`] if the engine's token fires
    /// - [`EngineError::ItemFailed`] if a bounded policy gives up on an item
    /// - [`EngineError::WorkerPanicked`] if the processor panics
    pub async fn run_counting<T, O, E, F, Fut, C>(
        &self,
        items: &[T],
        processor: F,
        is_found: C,
        observer: &dyn ProgressObserver,
    ) -> Result<EngineRun<O>, EngineError>
    where
        T: Clone + fmt::Display + Send + Sync + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, E>> + Send + 'static,
        O: Send + 'static,
        E: fmt::Display + Send + 'static,
        C: Fn(&O) -> bool,
    {
        let total = items.len();
        let started = Instant::now();
        let processor = Arc::new(processor);
        let mut slots: Vec<Option<O>> = std::iter::repeat_with(|| None).take(total).collect();
        let mut in_flight = JoinSet::new();
        let mut pending = items.iter().cloned().enumerate();
        let mut stats = RunStats::default();
        let mut sampler = ProgressSampler::new(total, self.config.progress_interval);

        info!(total, concurrency = self.config.concurrency, "starting retrieval run");
        observer.on_start(total);

        loop {
            while in_flight.len() < self.config.concurrency && !self.cancel.is_cancelled() {
                let Some((index, item)) = pending.next() else {
                    break;
                };
                let processor = Arc::clone(&processor);
                let policy = self.config.retry_policy.clone();
                let cancel = self.cancel.clone();
                let span = info_span!("item", index, item = %item);
                in_flight.spawn(
                    async move {
                        let result =
                            retry_with_timeout(&policy, &cancel, || (*processor)(item.clone()))
                                .await;
                        (index, item, result)
                    }
                    .instrument(span),
                );
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };

            let (index, item, result) = match joined {
                Ok(done) => done,
                Err(join_error) => {
                    in_flight.shutdown().await;
                    return Err(EngineError::WorkerPanicked(join_error.to_string()));
                }
            };

            match result {
                Ok(attempted) => {
                    stats.retried += u64::from(attempted.retries());
                    stats.processed += 1;
                    if is_found(&attempted.value) {
                        stats.found += 1;
                    }
                    slots[index] = Some(attempted.value);
                    if let Some(snapshot) = sampler.record(&stats) {
                        observer.on_progress(&snapshot);
                    }
                }
                Err(RetryError::Cancelled { .. }) => {}
                Err(RetryError::Exhausted {
                    attempts,
                    last_error,
                }) => {
                    warn!(%item, attempts, error = %last_error, "item failed after all attempts");
                    in_flight.shutdown().await;
                    return Err(EngineError::ItemFailed {
                        item: item.to_string(),
                        message: last_error.to_string(),
                    });
                }
            }
        }

        stats.elapsed = started.elapsed();

        if stats.processed < total {
            info!(processed = stats.processed, total, "retrieval run cancelled");
            return Err(EngineError::Cancelled {
                processed: stats.processed,
                total,
            });
        }

        observer.on_finish(&sampler.finish(&stats));
        info!(
            processed = stats.processed,
            found = stats.found,
            retried = stats.retried,
            elapsed_ms = stats.elapsed.as_millis(),
            "retrieval run complete"
        );

        let outcomes = slots.into_iter().flatten().collect();
        Ok(EngineRun { outcomes, stats })
    }
}

/// Decides when a progress report is due and computes throughput.
#[derive(Debug)]
struct ProgressSampler {
    total: usize,
    interval: usize,
    last_reported: usize,
    last_report_at: Instant,
}

impl ProgressSampler {
    fn new(total: usize, interval: usize) -> Self {
        Self {
            total,
            interval,
            last_reported: 0,
            last_report_at: Instant::now(),
        }
    }

    /// Returns a snapshot every `interval` completions and on the last item.
    fn record(&mut self, stats: &RunStats) -> Option<ProgressSnapshot> {
        let processed = stats.processed;
        let due = processed - self.last_reported >= self.interval || processed == self.total;
        due.then(|| self.snapshot(stats))
    }

    fn finish(&mut self, stats: &RunStats) -> ProgressSnapshot {
        self.snapshot(stats)
    }

    fn snapshot(&mut self, stats: &RunStats) -> ProgressSnapshot {
        let processed = stats.processed;
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_report_at).as_secs_f64();
        let delta = processed.saturating_sub(self.last_reported);
        #[allow(clippy::cast_precision_loss)]
        let items_per_sec = if elapsed > 0.0 { delta as f64 / elapsed } else { 0.0 };
        self.last_reported = processed;
        self.last_report_at = now;
        ProgressSnapshot {
            processed,
            total: self.total,
            found: stats.found,
            retried: stats.retried,
            items_per_sec,
        }
    }
}
