//! Progress events for long-running waits
//!
//! Every waiter can report what it is doing through an optional callback.
//! The CLI uses this to drive a spinner; library callers usually pass `None`.

use std::sync::Arc;
use std::time::Duration;

/// Progress events emitted while waiting on a resource
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A wait has started
    Started {
        kind: &'static str,
        identifier: String,
        target: &'static str,
    },
    /// Polling iteration with current status
    Polling {
        kind: &'static str,
        identifier: String,
        status: String,
        attempt: u32,
        elapsed: Duration,
    },
    /// The resource reached its target state
    Completed {
        kind: &'static str,
        identifier: String,
        status: String,
    },
    /// The wait failed or timed out
    Failed {
        kind: &'static str,
        identifier: String,
        error: String,
    },
}

/// Callback type for progress updates
///
/// Shared between every waiter of one workflow, hence `Arc`.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Helper to emit progress events
pub(crate) fn emit(callback: &Option<ProgressCallback>, event: ProgressEvent) {
    if let Some(cb) = callback {
        cb(event);
    }
}
