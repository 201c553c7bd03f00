//! Exit code logic for the uuid2asset process.
//!
//! Single responsibility: map bundle results to the process exit outcome.

use crate::ProcessExit;

/// Determines the process exit outcome from per-bundle results.
pub(crate) fn determine_exit_outcome(
    succeeded: usize,
    failed: usize,
    interrupted: bool,
) -> ProcessExit {
    if interrupted {
        ProcessExit::Interrupted
    } else if failed == 0 && succeeded > 0 {
        ProcessExit::Success
    } else {
        ProcessExit::Failure
    }
}
