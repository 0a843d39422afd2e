//! Bounded status polling
//!
//! [`poll`] repeatedly fetches a status, classifies it with a success and a
//! failure predicate, and sleeps a fixed delay between attempts until a
//! terminal outcome is reached or the attempt budget is spent.
//!
//! Transport errors from the fetch are tolerated for a bounded number of
//! consecutive attempts, which absorbs throttling and the eventual
//! consistency window right after a mutating call.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, Result};
use crate::provider::ProviderError;

/// Delay and attempt budget for one wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Time between status checks
    pub delay: Duration,
    /// Maximum number of status fetches
    pub max_attempts: u32,
    /// Consecutive transport errors tolerated before giving up
    pub max_transport_errors: u32,
}

impl PollingConfig {
    pub const DEFAULT_TRANSPORT_ERRORS: u32 = 3;

    pub fn new(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts,
            max_transport_errors: Self::DEFAULT_TRANSPORT_ERRORS,
        }
    }

    /// Cluster and instance creation or modification: 30s x 60
    pub fn provisioning() -> Self {
        Self::new(Duration::from_secs(30), 60)
    }

    /// Deletions: 30s x 60
    pub fn destructive() -> Self {
        Self::new(Duration::from_secs(30), 60)
    }

    /// Snapshot creation and copy: 10s x 100
    pub fn snapshot() -> Self {
        Self::new(Duration::from_secs(10), 100)
    }

    pub fn with_transport_errors(mut self, max_transport_errors: u32) -> Self {
        self.max_transport_errors = max_transport_errors;
        self
    }

    /// Upper bound on the time a wait spends sleeping
    pub fn budget(&self) -> Duration {
        self.delay * self.max_attempts
    }

    pub fn validate(&self) -> Result<()> {
        if self.delay.is_zero() {
            return Err(CoreError::Validation(
                "polling delay must be greater than zero".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(CoreError::Validation(
                "polling max attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Polling budgets for each class of operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingSettings {
    pub provisioning: PollingConfig,
    pub destructive: PollingConfig,
    pub snapshot: PollingConfig,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            provisioning: PollingConfig::provisioning(),
            destructive: PollingConfig::destructive(),
            snapshot: PollingConfig::snapshot(),
        }
    }
}

/// Terminal result of one poll
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome<S> {
    /// The success predicate held for this status
    Succeeded(S),
    /// The failure predicate held, or transport errors persisted
    Failed {
        reason: String,
        last_status: Option<S>,
    },
    /// Attempts ran out while the status was still non-terminal
    TimedOut {
        attempts: u32,
        last_status: Option<S>,
    },
}

impl<S> WaitOutcome<S> {
    pub fn is_succeeded(&self) -> bool {
        matches!(self, WaitOutcome::Succeeded(_))
    }

    pub fn last_status(&self) -> Option<&S> {
        match self {
            WaitOutcome::Succeeded(status) => Some(status),
            WaitOutcome::Failed { last_status, .. } | WaitOutcome::TimedOut { last_status, .. } => {
                last_status.as_ref()
            }
        }
    }

    pub fn map<T>(self, f: impl Fn(S) -> T) -> WaitOutcome<T> {
        match self {
            WaitOutcome::Succeeded(status) => WaitOutcome::Succeeded(f(status)),
            WaitOutcome::Failed {
                reason,
                last_status,
            } => WaitOutcome::Failed {
                reason,
                last_status: last_status.map(f),
            },
            WaitOutcome::TimedOut {
                attempts,
                last_status,
            } => WaitOutcome::TimedOut {
                attempts,
                last_status: last_status.map(f),
            },
        }
    }
}

/// Poll `fetch` until `is_success` or `is_failure` holds or attempts run out
///
/// `on_attempt` sees every successfully fetched status with its 1-based
/// attempt number. The fetch is never invoked more than
/// `config.max_attempts` times, and no delay follows a terminal status or
/// the final attempt.
///
/// Transient fetch errors (throttling, connection trouble) are tolerated up
/// to `config.max_transport_errors` in a row. Any other error fails the wait
/// at once.
///
/// # Example
///
/// ```rust,ignore
/// let outcome = poll(
///     &PollingConfig::new(Duration::from_secs(10), 100),
///     || api.describe_cluster_snapshot("snap1"),
///     |s| s.status == "available",
///     |s| s.status == "failed",
///     |_, _| {},
/// )
/// .await;
/// ```
pub async fn poll<S, F, Fut, P, Q, A>(
    config: &PollingConfig,
    mut fetch: F,
    is_success: P,
    is_failure: Q,
    mut on_attempt: A,
) -> WaitOutcome<S>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<S, ProviderError>>,
    P: Fn(&S) -> bool,
    Q: Fn(&S) -> bool,
    A: FnMut(u32, &S),
{
    let mut last_status: Option<S> = None;
    let mut consecutive_errors = 0u32;

    for attempt in 1..=config.max_attempts {
        match fetch().await {
            Ok(status) => {
                consecutive_errors = 0;
                on_attempt(attempt, &status);

                if is_success(&status) {
                    debug!(attempt, "Success condition reached");
                    return WaitOutcome::Succeeded(status);
                }
                if is_failure(&status) {
                    debug!(attempt, "Failure condition reached");
                    return WaitOutcome::Failed {
                        reason: "terminal failure status".to_string(),
                        last_status: Some(status),
                    };
                }
                last_status = Some(status);
            }
            Err(err) if !err.is_transient() => {
                warn!(attempt, error = %err, "Status fetch rejected, giving up");
                return WaitOutcome::Failed {
                    reason: err.to_string(),
                    last_status,
                };
            }
            Err(err) => {
                consecutive_errors += 1;
                if consecutive_errors > config.max_transport_errors {
                    warn!(attempt, error = %err, "Status fetch kept failing, giving up");
                    return WaitOutcome::Failed {
                        reason: err.to_string(),
                        last_status,
                    };
                }
                warn!(
                    attempt,
                    consecutive_errors,
                    error = %err,
                    "Status fetch failed, treating as not yet terminal"
                );
            }
        }

        if attempt < config.max_attempts {
            tokio::time::sleep(config.delay).await;
        }
    }

    WaitOutcome::TimedOut {
        attempts: config.max_attempts,
        last_status,
    }
}
