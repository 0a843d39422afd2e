//! Cluster snapshot waiter
//!
//! A failed snapshot wait is always an explicit `WaitFailed` or
//! `WaitTimeout` error so operators can tell a stuck snapshot from a broken
//! one.

use std::sync::Arc;

use tracing::info;

use super::{DescribeFuture, Handle, ResourceKind, ResourceWaiter, Target, present};
use crate::error::{CoreError, Result};
use crate::poller::PollingConfig;
use crate::progress::ProgressCallback;
use crate::provider::{CopySnapshotRequest, RdsApi};
use crate::types::SnapshotInfo;

/// Cluster snapshot resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot;

impl ResourceKind for Snapshot {
    type Info = SnapshotInfo;

    const NAME: &'static str = "snapshot";
    const AVAILABLE: &'static [&'static str] = &["available"];
    const FAILED: &'static [&'static str] = &[
        "failed",
        "deleted",
        "deleting",
        "incompatible-restore",
        "incompatible-parameters",
    ];
    const DELETE_FAILED: &'static [&'static str] = &[];

    fn describe<'a>(api: &'a dyn RdsApi, identifier: &'a str) -> DescribeFuture<'a, SnapshotInfo> {
        Box::pin(async move { api.describe_cluster_snapshot(identifier).await })
    }
}

/// Create, copy, share and delete one cluster snapshot
pub struct SnapshotWaiter {
    waiter: ResourceWaiter<Snapshot>,
    identifier: String,
    polling: PollingConfig,
}

impl SnapshotWaiter {
    pub fn new(api: Arc<dyn RdsApi>, identifier: impl Into<String>, polling: PollingConfig) -> Self {
        Self {
            waiter: ResourceWaiter::new(api),
            identifier: identifier.into(),
            polling,
        }
    }

    pub fn with_progress(mut self, on_progress: Option<ProgressCallback>) -> Self {
        self.waiter = self.waiter.with_progress(on_progress);
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    fn require_identifier(&self) -> Result<()> {
        if self.identifier.trim().is_empty() {
            return Err(CoreError::Validation(
                "snapshot identifier required".to_string(),
            ));
        }
        Ok(())
    }

    /// Issue the create-snapshot request for `cluster_identifier`
    pub async fn submit_create(&self, cluster_identifier: &str) -> Result<Handle<Snapshot>> {
        self.require_identifier()?;
        info!(
            snapshot = %self.identifier,
            cluster = cluster_identifier,
            "Creating cluster snapshot"
        );
        self.waiter
            .api()
            .create_cluster_snapshot(cluster_identifier, &self.identifier)
            .await?;
        Ok(Handle::new(&self.identifier, Target::Available))
    }

    /// Snapshot `cluster_identifier` and block until the snapshot is available
    pub async fn create_snapshot_and_wait(&self, cluster_identifier: &str) -> Result<SnapshotInfo> {
        let handle = self.submit_create(cluster_identifier).await?;
        let observed = self.waiter.wait_for(&handle, &self.polling).await?;
        present::<Snapshot>(observed, &self.identifier)
    }

    /// Copy `source` into this snapshot, optionally re-encrypting with `kms_key_id`
    pub async fn copy_snapshot_and_wait(
        &self,
        source: &str,
        kms_key_id: Option<&str>,
        wait: bool,
    ) -> Result<SnapshotInfo> {
        self.require_identifier()?;
        let request = CopySnapshotRequest {
            source_snapshot_identifier: source.to_string(),
            target_snapshot_identifier: self.identifier.clone(),
            kms_key_id: kms_key_id.map(str::to_string),
        };
        info!(source, target = %self.identifier, "Copying cluster snapshot");
        let copied = self.waiter.api().copy_cluster_snapshot(&request).await?;
        if !wait {
            return Ok(copied);
        }
        let handle = Handle::new(&self.identifier, Target::Available);
        let observed = self.waiter.wait_for(&handle, &self.polling).await?;
        present::<Snapshot>(observed, &self.identifier)
    }

    /// Delete this snapshot; with `wait` block until it is gone
    pub async fn delete_snapshot(&self, wait: bool) -> Result<bool> {
        self.require_identifier()?;
        info!(snapshot = %self.identifier, "Deleting cluster snapshot");
        self.waiter
            .api()
            .delete_cluster_snapshot(&self.identifier)
            .await?;
        if !wait {
            return Ok(false);
        }
        let handle = Handle::new(&self.identifier, Target::Gone);
        self.waiter.wait_for(&handle, &self.polling).await?;
        Ok(true)
    }

    /// Allow `account_id` to restore from this snapshot
    pub async fn share_snapshot(&self, account_id: &str) -> Result<()> {
        self.require_identifier()?;
        if account_id.trim().is_empty() {
            return Err(CoreError::Validation(
                "account id required to share a snapshot".to_string(),
            ));
        }
        info!(snapshot = %self.identifier, account_id, "Sharing cluster snapshot");
        self.waiter
            .api()
            .share_cluster_snapshot(&self.identifier, account_id)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakeRds};
    use std::time::Duration;

    fn polling() -> PollingConfig {
        PollingConfig::new(Duration::from_secs(10), 5)
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_snapshot_and_wait() {
        let fake = FakeRds::new();
        fake.add_cluster(FakeRds::cluster("c1", "available"));
        fake.script_snapshot_statuses("final", &["creating", "available"]);

        let snapshot = SnapshotWaiter::new(fake.clone().into_api(), "final", polling())
            .create_snapshot_and_wait("c1")
            .await
            .unwrap();

        assert_eq!(snapshot.identifier, "final");
        assert_eq!(snapshot.cluster_identifier, "c1");
        assert_eq!(snapshot.status, "available");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_snapshot_is_explicit_error() {
        let fake = FakeRds::new();
        fake.add_cluster(FakeRds::cluster("c1", "available"));
        fake.script_snapshot_statuses("final", &["creating", "failed"]);

        let err = SnapshotWaiter::new(fake.into_api(), "final", polling())
            .create_snapshot_and_wait("c1")
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::WaitFailed { .. }));
        assert_eq!(err.last_status(), Some("failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_snapshot_is_timeout() {
        let fake = FakeRds::new();
        fake.add_cluster(FakeRds::cluster("c1", "available"));
        fake.script_snapshot_statuses("final", &["creating"; 5]);

        let err = SnapshotWaiter::new(fake.into_api(), "final", polling())
            .create_snapshot_and_wait("c1")
            .await
            .unwrap_err();

        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_copy_without_wait_returns_request_result() {
        let fake = FakeRds::new();
        fake.add_snapshot(FakeRds::snapshot("source", "c1", "available"));

        let copied = SnapshotWaiter::new(fake.clone().into_api(), "copy", polling())
            .copy_snapshot_and_wait("source", Some("alias/backups"), false)
            .await
            .unwrap();

        assert_eq!(copied.identifier, "copy");
        assert_eq!(
            fake.calls(),
            vec![Call::CopySnapshot {
                source: "source".to_string(),
                target: "copy".to_string(),
                kms_key_id: Some("alias/backups".to_string()),
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_share_requires_account() {
        let fake = FakeRds::new();
        let err = SnapshotWaiter::new(fake.clone().into_api(), "snap1", polling())
            .share_snapshot("")
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert!(fake.calls().is_empty());
    }
}
