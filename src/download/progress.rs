//! Progress reporting hooks for retrieval runs.

use tracing::info;

/// Point-in-time view of a run, handed to a [`ProgressObserver`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    /// Items that reached a terminal outcome.
    pub processed: usize,
    /// Items in the run.
    pub total: usize,
    /// Processed items that produced a result worth keeping.
    pub found: usize,
    /// Retry attempts so far.
    pub retried: u64,
    /// Completions per second since the previous report.
    pub items_per_sec: f64,
}

impl ProgressSnapshot {
    /// Completion percentage, rounded to the nearest integer.
    #[must_use]
    pub fn percent(&self) -> usize {
        if self.total == 0 {
            return 100;
        }
        (self.processed * 100 + self.total / 2) / self.total
    }
}

/// Receives progress from a [`RetrievalEngine`](super::RetrievalEngine) run.
///
/// Callbacks are invoked from the driving task, never concurrently.
pub trait ProgressObserver: Send + Sync {
    /// Called once before any item starts.
    fn on_start(&self, _total: usize) {}

    /// Called every progress interval and after the last item.
    fn on_progress(&self, snapshot: &ProgressSnapshot);

    /// Called once when every item has completed.
    fn on_finish(&self, _snapshot: &ProgressSnapshot) {}
}

/// Observer that emits one `tracing` info event per report.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        info!(
            processed = snapshot.processed,
            total = snapshot.total,
            percent = snapshot.percent(),
            found = snapshot.found,
            items_per_sec = format_args!("{:.1}", snapshot.items_per_sec),
            "progress {}/{} ({}%)",
            snapshot.processed,
            snapshot.total,
            snapshot.percent()
        );
    }
}

/// Observer that discards all reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentProgress;

impl ProgressObserver for SilentProgress {
    fn on_progress(&self, _snapshot: &ProgressSnapshot) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(processed: usize, total: usize) -> ProgressSnapshot {
        ProgressSnapshot {
            processed,
            total,
            found: 0,
            retried: 0,
            items_per_sec: 0.0,
        }
    }

    #[test]
    fn test_percent_rounds() {
        assert_eq!(snapshot(0, 3).percent(), 0);
        assert_eq!(snapshot(1, 3).percent(), 33);
        assert_eq!(snapshot(2, 3).percent(), 67);
        assert_eq!(snapshot(50, 900).percent(), 6);
        assert_eq!(snapshot(900, 900).percent(), 100);
    }

    #[test]
    fn test_percent_of_empty_run_is_complete() {
        assert_eq!(snapshot(0, 0).percent(), 100);
    }
}
