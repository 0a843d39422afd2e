//! Resource waiters
//!
//! A single generic [`ResourceWaiter`] polls any [`ResourceKind`] (cluster,
//! instance, snapshot). Mutations and waits are separate steps: a facade's
//! `submit_*` call issues the request and returns a [`Handle`], and
//! [`ResourceWaiter::wait`] polls that handle's resource until its
//! [`Target`] is reached.
//!
//! The `*_and_wait` operations on [`ClusterWaiter`], [`InstanceWaiter`] and
//! [`SnapshotWaiter`] compose the two.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{CoreError, Result};
use crate::poller::{PollingConfig, WaitOutcome, poll};
use crate::progress::{ProgressCallback, ProgressEvent, emit};
use crate::provider::{ProviderResult, RdsApi};
use crate::types::HasStatus;

mod cluster;
mod instance;
mod snapshot;

pub use cluster::{Cluster, ClusterConfig, ClusterWaiter};
pub use instance::{Instance, InstanceConfig, InstanceWaiter};
pub use snapshot::{Snapshot, SnapshotWaiter};

/// Boxed future returned by [`ResourceKind::describe`]
pub type DescribeFuture<'a, T> = Pin<Box<dyn Future<Output = ProviderResult<T>> + Send + 'a>>;

/// A kind of RDS resource that can be waited on
pub trait ResourceKind: Send + Sync + 'static {
    type Info: HasStatus + Clone + fmt::Debug + Send + Sync;

    /// Human-readable kind name used in logs and errors
    const NAME: &'static str;

    /// Statuses in which the resource is usable
    const AVAILABLE: &'static [&'static str];

    /// Statuses from which the resource will never become available
    const FAILED: &'static [&'static str];

    /// Statuses that mean a requested deletion is not going to happen
    const DELETE_FAILED: &'static [&'static str];

    /// Fetch the current state of one resource
    fn describe<'a>(api: &'a dyn RdsApi, identifier: &'a str) -> DescribeFuture<'a, Self::Info>;

    /// Whether all accepted modifications have been applied
    fn is_applied(_info: &Self::Info) -> bool {
        true
    }
}

/// What a single status fetch saw
#[derive(Debug, Clone, PartialEq)]
pub enum Observed<T> {
    Present(T),
    /// The describe call reported the resource as not found
    Absent,
}

impl<T: HasStatus> Observed<T> {
    pub fn status(&self) -> &str {
        match self {
            Observed::Present(info) => info.status(),
            Observed::Absent => "not-found",
        }
    }

    pub fn into_present(self) -> Option<T> {
        match self {
            Observed::Present(info) => Some(info),
            Observed::Absent => None,
        }
    }
}

/// The state a wait is trying to reach
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Status is one of the kind's available statuses
    Available,
    /// Available, and every accepted modification has been applied
    Applied,
    /// The resource no longer shows up in describe calls
    Gone,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Available => "available",
            Target::Applied => "applied",
            Target::Gone => "deleted",
        }
    }

    fn is_reached<K: ResourceKind>(&self, observed: &Observed<K::Info>) -> bool {
        match (self, observed) {
            (Target::Gone, Observed::Absent) => true,
            (Target::Available, Observed::Present(info)) => K::AVAILABLE.contains(&info.status()),
            (Target::Applied, Observed::Present(info)) => {
                K::AVAILABLE.contains(&info.status()) && K::is_applied(info)
            }
            _ => false,
        }
    }

    fn is_failed<K: ResourceKind>(&self, observed: &Observed<K::Info>) -> bool {
        match (self, observed) {
            (Target::Available | Target::Applied, Observed::Present(info)) => {
                K::FAILED.contains(&info.status())
            }
            (Target::Gone, Observed::Present(info)) => K::DELETE_FAILED.contains(&info.status()),
            (_, Observed::Absent) => false,
        }
    }
}

/// A submitted mutation: which resource, and what state it should reach
#[derive(Debug, Clone, PartialEq)]
pub struct Handle<K> {
    identifier: String,
    target: Target,
    _kind: PhantomData<K>,
}

impl<K: ResourceKind> Handle<K> {
    pub fn new(identifier: impl Into<String>, target: Target) -> Self {
        Self {
            identifier: identifier.into(),
            target,
            _kind: PhantomData,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn target(&self) -> Target {
        self.target
    }
}

/// Polls one kind of resource through the provider
pub struct ResourceWaiter<K> {
    api: Arc<dyn RdsApi>,
    on_progress: Option<ProgressCallback>,
    _kind: PhantomData<K>,
}

impl<K: ResourceKind> ResourceWaiter<K> {
    pub fn new(api: Arc<dyn RdsApi>) -> Self {
        Self {
            api,
            on_progress: None,
            _kind: PhantomData,
        }
    }

    pub fn with_progress(mut self, on_progress: Option<ProgressCallback>) -> Self {
        self.on_progress = on_progress;
        self
    }

    pub fn api(&self) -> &dyn RdsApi {
        self.api.as_ref()
    }

    /// Fetch the current state, mapping "not found" to [`Observed::Absent`]
    pub async fn observe(&self, identifier: &str) -> ProviderResult<Observed<K::Info>> {
        match K::describe(self.api.as_ref(), identifier).await {
            Ok(info) => Ok(Observed::Present(info)),
            Err(e) if e.is_not_found() => Ok(Observed::Absent),
            Err(e) => Err(e),
        }
    }

    /// Poll the handle's resource until its target is reached
    pub async fn wait(
        &self,
        handle: &Handle<K>,
        polling: &PollingConfig,
    ) -> WaitOutcome<Observed<K::Info>> {
        let identifier = handle.identifier();
        let target = handle.target();
        let start = Instant::now();

        info!(
            kind = K::NAME,
            identifier,
            target = target.as_str(),
            delay_secs = polling.delay.as_secs(),
            max_attempts = polling.max_attempts,
            "Waiting for resource"
        );
        emit(
            &self.on_progress,
            ProgressEvent::Started {
                kind: K::NAME,
                identifier: identifier.to_string(),
                target: target.as_str(),
            },
        );

        let outcome = poll(
            polling,
            || self.observe(identifier),
            |observed| target.is_reached::<K>(observed),
            |observed| target.is_failed::<K>(observed),
            |attempt, observed| {
                debug!(kind = K::NAME, identifier, attempt, status = observed.status(), "Polled");
                emit(
                    &self.on_progress,
                    ProgressEvent::Polling {
                        kind: K::NAME,
                        identifier: identifier.to_string(),
                        status: observed.status().to_string(),
                        attempt,
                        elapsed: start.elapsed(),
                    },
                );
            },
        )
        .await;

        match &outcome {
            WaitOutcome::Succeeded(observed) => {
                info!(kind = K::NAME, identifier, status = observed.status(), "Resource ready");
                emit(
                    &self.on_progress,
                    ProgressEvent::Completed {
                        kind: K::NAME,
                        identifier: identifier.to_string(),
                        status: observed.status().to_string(),
                    },
                );
            }
            WaitOutcome::Failed {
                reason,
                last_status,
            } => {
                let status = last_status.as_ref().map(|o| o.status()).unwrap_or("unknown");
                warn!(kind = K::NAME, identifier, status, reason = %reason, "Wait failed");
                emit(
                    &self.on_progress,
                    ProgressEvent::Failed {
                        kind: K::NAME,
                        identifier: identifier.to_string(),
                        error: format!("{} (status {})", reason, status),
                    },
                );
            }
            WaitOutcome::TimedOut {
                attempts,
                last_status,
            } => {
                let status = last_status.as_ref().map(|o| o.status()).unwrap_or("unknown");
                warn!(kind = K::NAME, identifier, status, attempts, "Wait timed out");
                emit(
                    &self.on_progress,
                    ProgressEvent::Failed {
                        kind: K::NAME,
                        identifier: identifier.to_string(),
                        error: format!("timed out after {} attempts (status {})", attempts, status),
                    },
                );
            }
        }

        outcome
    }

    /// Like [`wait`](Self::wait), converting non-success into a typed error
    pub async fn wait_for(
        &self,
        handle: &Handle<K>,
        polling: &PollingConfig,
    ) -> Result<Observed<K::Info>> {
        let outcome = self.wait(handle, polling).await;
        settle::<K>(outcome, handle.identifier(), polling)
    }
}

/// Turn a wait outcome into the resource state or a typed error
pub fn settle<K: ResourceKind>(
    outcome: WaitOutcome<Observed<K::Info>>,
    identifier: &str,
    polling: &PollingConfig,
) -> Result<Observed<K::Info>> {
    match outcome {
        WaitOutcome::Succeeded(observed) => Ok(observed),
        WaitOutcome::Failed {
            reason,
            last_status,
        } => {
            let last_status = last_status.map(|o| o.status().to_string());
            let reason = match &last_status {
                Some(status) if K::FAILED.contains(&status.as_str())
                    || K::DELETE_FAILED.contains(&status.as_str()) =>
                {
                    format!("resource entered status '{}'", status)
                }
                _ => reason,
            };
            Err(CoreError::WaitFailed {
                kind: K::NAME,
                identifier: identifier.to_string(),
                reason,
                last_status,
            })
        }
        WaitOutcome::TimedOut {
            attempts,
            last_status,
        } => Err(CoreError::WaitTimeout {
            kind: K::NAME,
            identifier: identifier.to_string(),
            attempts,
            waited: polling.budget(),
            last_status: last_status.map(|o| o.status().to_string()),
        }),
    }
}

/// Return the present resource, or `NotFound` if it vanished
pub(crate) fn present<K: ResourceKind>(observed: Observed<K::Info>, identifier: &str) -> Result<K::Info> {
    observed.into_present().ok_or_else(|| CoreError::NotFound {
        kind: K::NAME,
        identifier: identifier.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRds;
    use crate::types::ClusterInfo;
    use std::sync::Mutex;
    use std::time::Duration;

    fn cluster(status: &str) -> ClusterInfo {
        FakeRds::cluster("c1", status)
    }

    #[test]
    fn test_target_available() {
        assert!(Target::Available.is_reached::<Cluster>(&Observed::Present(cluster("available"))));
        assert!(!Target::Available.is_reached::<Cluster>(&Observed::Present(cluster("creating"))));
        assert!(!Target::Available.is_reached::<Cluster>(&Observed::Absent));
        assert!(Target::Available.is_failed::<Cluster>(&Observed::Present(cluster("failed"))));
        assert!(
            Target::Available
                .is_failed::<Cluster>(&Observed::Present(cluster("incompatible-parameters")))
        );
        // Not yet visible right after a create call
        assert!(!Target::Available.is_failed::<Cluster>(&Observed::Absent));
    }

    #[test]
    fn test_target_applied_requires_no_pending_password() {
        let mut info = cluster("available");
        info.pending_password_change = true;
        assert!(!Target::Applied.is_reached::<Cluster>(&Observed::Present(info.clone())));

        info.pending_password_change = false;
        assert!(Target::Applied.is_reached::<Cluster>(&Observed::Present(info)));
    }

    #[test]
    fn test_target_gone() {
        assert!(Target::Gone.is_reached::<Cluster>(&Observed::Absent));
        assert!(!Target::Gone.is_reached::<Cluster>(&Observed::Present(cluster("deleting"))));
        assert!(!Target::Gone.is_failed::<Cluster>(&Observed::Present(cluster("deleting"))));
        assert!(Target::Gone.is_failed::<Cluster>(&Observed::Present(cluster("modifying"))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_emits_progress_events() {
        let fake = FakeRds::new();
        fake.add_cluster(cluster("creating"));
        fake.script_cluster_statuses("c1", &["creating", "available"]);

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let callback: ProgressCallback = Arc::new(move |event| sink.lock().unwrap().push(event));

        let waiter = ResourceWaiter::<Cluster>::new(fake.clone().into_api()).with_progress(Some(callback));
        let handle = Handle::new("c1", Target::Available);
        let outcome = waiter
            .wait(&handle, &PollingConfig::new(Duration::from_secs(5), 10))
            .await;

        assert!(outcome.is_succeeded());
        let events = events.lock().unwrap();
        assert!(matches!(events.first(), Some(ProgressEvent::Started { target: "available", .. })));
        assert!(matches!(events.last(), Some(ProgressEvent::Completed { status, .. }) if status == "available"));
        let polls = events
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Polling { .. }))
            .count();
        assert_eq!(polls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_reports_failed_status() {
        let fake = FakeRds::new();
        fake.add_cluster(cluster("creating"));
        fake.script_cluster_statuses("c1", &["creating", "incompatible-parameters"]);

        let waiter = ResourceWaiter::<Cluster>::new(fake.into_api());
        let err = waiter
            .wait_for(
                &Handle::new("c1", Target::Available),
                &PollingConfig::new(Duration::from_secs(5), 10),
            )
            .await
            .unwrap_err();

        assert_eq!(err.last_status(), Some("incompatible-parameters"));
        assert!(err.to_string().contains("incompatible-parameters"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_reports_timeout_with_last_status() {
        let fake = FakeRds::new();
        fake.add_cluster(cluster("creating"));

        let waiter = ResourceWaiter::<Cluster>::new(fake.into_api());
        let err = waiter
            .wait_for(
                &Handle::new("c1", Target::Available),
                &PollingConfig::new(Duration::from_secs(5), 3),
            )
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(err.last_status(), Some("creating"));
    }
}
