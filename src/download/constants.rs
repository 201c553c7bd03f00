//! Constants for the download module (timeouts, concurrency, progress).

use std::time::Duration;

/// HTTP connect timeout. Kept below the attempt timeout so a dead host fails
/// the attempt with a network error rather than a generic timeout.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Upper bound for a single fetch attempt, including reading the body.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fixed pause between attempts of the same task.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Default number of requests in flight.
pub const DEFAULT_CONCURRENCY: usize = 400;

/// Default number of completions between progress reports.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 50;

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 4096;
