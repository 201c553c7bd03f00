//! Progress UI (bar) for retrieval runs.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use uuid2asset_core::download::{LogProgress, ProgressObserver, ProgressSnapshot};

/// Terminal progress bar driven by engine snapshots.
///
/// Reports are also logged at debug level so `-v` runs keep the textual
/// `processed/total` lines.
pub(crate) struct BarProgress {
    bar: ProgressBar,
    label: String,
}

impl BarProgress {
    pub(crate) fn new(label: impl Into<String>) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_style(
            ProgressStyle::with_template(
                "{msg} [{bar:40}] {pos}/{len} ({percent}%) {per_sec} eta {eta}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
        );
        Self {
            bar,
            label: label.into(),
        }
    }
}

impl ProgressObserver for BarProgress {
    fn on_start(&self, total: usize) {
        self.bar.reset();
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_message(self.label.clone());
        self.bar.set_draw_target(ProgressDrawTarget::stderr());
    }

    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        self.bar.set_position(snapshot.processed as u64);
        self.bar
            .set_message(format!("{} ({} found)", self.label, snapshot.found));
        tracing::debug!(
            processed = snapshot.processed,
            total = snapshot.total,
            found = snapshot.found,
            retried = snapshot.retried,
            "progress {}/{} ({}%)",
            snapshot.processed,
            snapshot.total,
            snapshot.percent()
        );
    }

    fn on_finish(&self, snapshot: &ProgressSnapshot) {
        self.bar.set_position(snapshot.processed as u64);
        self.bar.finish_and_clear();
    }
}

/// Picks the bar for interactive terminals and log lines otherwise.
pub(crate) fn make_observer(use_bar: bool, label: &str) -> std::sync::Arc<dyn ProgressObserver> {
    if use_bar {
        std::sync::Arc::new(BarProgress::new(label))
    } else {
        std::sync::Arc::new(LogProgress)
    }
}
