//! Aurora cluster waiter

use std::fmt;
use std::sync::Arc;

use tracing::info;

use super::{DescribeFuture, Handle, ResourceKind, ResourceWaiter, Target, present};
use crate::error::{CoreError, Result};
use crate::poller::PollingConfig;
use crate::progress::ProgressCallback;
use crate::provider::{RdsApi, RestoreClusterRequest};
use crate::types::ClusterInfo;

/// Cluster resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cluster;

impl ResourceKind for Cluster {
    type Info = ClusterInfo;

    const NAME: &'static str = "cluster";
    const AVAILABLE: &'static [&'static str] = &["available"];
    const FAILED: &'static [&'static str] = &[
        "failed",
        "incompatible-parameters",
        "incompatible-restore",
        "incompatible-network",
        "inaccessible-encryption-credentials",
    ];
    const DELETE_FAILED: &'static [&'static str] =
        &["creating", "modifying", "rebooting", "resetting-master-credentials"];

    fn describe<'a>(api: &'a dyn RdsApi, identifier: &'a str) -> DescribeFuture<'a, ClusterInfo> {
        Box::pin(async move { api.describe_cluster(identifier).await })
    }

    fn is_applied(info: &ClusterInfo) -> bool {
        !info.pending_password_change
    }
}

/// Everything needed to restore a cluster from a snapshot
#[derive(Clone, PartialEq)]
pub struct ClusterConfig {
    pub snapshot_identifier: String,
    pub engine: String,
    pub db_subnet_group_name: String,
    pub vpc_security_group_id: String,
    pub db_cluster_parameter_group_name: String,
    pub master_password: String,
}

impl ClusterConfig {
    /// Every create-path field must be set
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("snapshot identifier", &self.snapshot_identifier),
            ("engine", &self.engine),
            ("db subnet group name", &self.db_subnet_group_name),
            ("vpc security group id", &self.vpc_security_group_id),
            (
                "db cluster parameter group name",
                &self.db_cluster_parameter_group_name,
            ),
            ("master password", &self.master_password),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(CoreError::Validation(format!(
                    "{} required to create a cluster",
                    name
                )));
            }
        }
        Ok(())
    }

    fn restore_request(&self, cluster_identifier: &str) -> RestoreClusterRequest {
        RestoreClusterRequest {
            cluster_identifier: cluster_identifier.to_string(),
            snapshot_identifier: self.snapshot_identifier.clone(),
            engine: self.engine.clone(),
            db_subnet_group_name: self.db_subnet_group_name.clone(),
            vpc_security_group_id: self.vpc_security_group_id.clone(),
            db_cluster_parameter_group_name: self.db_cluster_parameter_group_name.clone(),
        }
    }
}

impl fmt::Debug for ClusterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterConfig")
            .field("snapshot_identifier", &self.snapshot_identifier)
            .field("engine", &self.engine)
            .field("db_subnet_group_name", &self.db_subnet_group_name)
            .field("vpc_security_group_id", &self.vpc_security_group_id)
            .field(
                "db_cluster_parameter_group_name",
                &self.db_cluster_parameter_group_name,
            )
            .field("master_password", &"***")
            .finish()
    }
}

/// Create, modify and delete one cluster, waiting on each change
///
/// Built with [`ClusterWaiter::new`] the waiter can only delete; the create
/// and password paths need [`ClusterWaiter::for_creation`].
pub struct ClusterWaiter {
    waiter: ResourceWaiter<Cluster>,
    identifier: String,
    config: Option<ClusterConfig>,
    polling: PollingConfig,
}

impl ClusterWaiter {
    /// A waiter for delete/describe use; no create config is checked
    pub fn new(api: Arc<dyn RdsApi>, identifier: impl Into<String>, polling: PollingConfig) -> Self {
        Self {
            waiter: ResourceWaiter::new(api),
            identifier: identifier.into(),
            config: None,
            polling,
        }
    }

    /// A waiter that can restore the cluster; validates `config` up front
    pub fn for_creation(
        api: Arc<dyn RdsApi>,
        identifier: impl Into<String>,
        config: ClusterConfig,
        polling: PollingConfig,
    ) -> Result<Self> {
        let identifier = identifier.into();
        if identifier.trim().is_empty() {
            return Err(CoreError::Validation(
                "cluster identifier required".to_string(),
            ));
        }
        config.validate()?;
        polling.validate()?;
        Ok(Self {
            waiter: ResourceWaiter::new(api),
            identifier,
            config: Some(config),
            polling,
        })
    }

    pub fn with_progress(mut self, on_progress: Option<ProgressCallback>) -> Self {
        self.waiter = self.waiter.with_progress(on_progress);
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn waiter(&self) -> &ResourceWaiter<Cluster> {
        &self.waiter
    }

    fn creation_config(&self) -> Result<&ClusterConfig> {
        self.config.as_ref().ok_or_else(|| {
            CoreError::Validation(format!(
                "cluster waiter for '{}' was not built for creation",
                self.identifier
            ))
        })
    }

    /// Issue the restore-from-snapshot request
    pub async fn submit_restore(&self) -> Result<Handle<Cluster>> {
        let config = self.creation_config()?;
        let request = config.restore_request(&self.identifier);
        info!(
            cluster = %self.identifier,
            snapshot = %config.snapshot_identifier,
            "Restoring cluster from snapshot"
        );
        self.waiter.api().restore_cluster_from_snapshot(&request).await?;
        Ok(Handle::new(&self.identifier, Target::Available))
    }

    /// Issue the master password reset
    pub async fn submit_password_reset(&self) -> Result<Handle<Cluster>> {
        let config = self.creation_config()?;
        info!(cluster = %self.identifier, "Resetting master password");
        self.waiter
            .api()
            .modify_master_password(&self.identifier, &config.master_password)
            .await?;
        Ok(Handle::new(&self.identifier, Target::Applied))
    }

    /// Issue the delete request
    pub async fn submit_delete(&self, skip_snapshot: bool) -> Result<Handle<Cluster>> {
        info!(cluster = %self.identifier, skip_snapshot, "Deleting cluster");
        self.waiter
            .api()
            .delete_cluster(&self.identifier, skip_snapshot)
            .await?;
        Ok(Handle::new(&self.identifier, Target::Gone))
    }

    /// Restore the cluster and block until it is available
    pub async fn create_cluster_and_wait(&self) -> Result<ClusterInfo> {
        let handle = self.submit_restore().await?;
        let observed = self.waiter.wait_for(&handle, &self.polling).await?;
        present::<Cluster>(observed, &self.identifier)
    }

    /// Reset the master password and block until the change is applied
    pub async fn update_password_and_wait(&self) -> Result<ClusterInfo> {
        let handle = self.submit_password_reset().await?;
        let observed = self.waiter.wait_for(&handle, &self.polling).await?;
        present::<Cluster>(observed, &self.identifier)
    }

    /// Delete the cluster; with `wait` block until it is gone
    ///
    /// Returns `true` when the deletion was confirmed, `false` when the
    /// request was only submitted.
    pub async fn delete_cluster_and_wait(&self, skip_snapshot: bool, wait: bool) -> Result<bool> {
        let handle = self.submit_delete(skip_snapshot).await?;
        if !wait {
            info!(cluster = %self.identifier, "Delete requested, not waiting");
            return Ok(false);
        }
        self.waiter.wait_for(&handle, &self.polling).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakeRds};
    use std::time::Duration;

    fn config() -> ClusterConfig {
        ClusterConfig {
            snapshot_identifier: "snap1".to_string(),
            engine: "aurora-postgresql".to_string(),
            db_subnet_group_name: "subnets".to_string(),
            vpc_security_group_id: "sg-123".to_string(),
            db_cluster_parameter_group_name: "params".to_string(),
            master_password: "hunter22".to_string(),
        }
    }

    fn polling() -> PollingConfig {
        PollingConfig::new(Duration::from_secs(30), 10)
    }

    #[test]
    fn test_config_validation() {
        assert!(config().validate().is_ok());

        let mut missing = config();
        missing.db_subnet_group_name = String::new();
        let err = missing.validate().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("subnet group"));
    }

    #[test]
    fn test_config_debug_redacts_password() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("hunter22"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn test_for_creation_rejects_invalid_config_without_remote_calls() {
        let fake = FakeRds::new();
        let mut bad = config();
        bad.master_password = " ".to_string();

        let result = ClusterWaiter::for_creation(fake.clone().into_api(), "c1", bad, polling());

        assert!(result.is_err());
        assert!(fake.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_only_waiter_cannot_create() {
        let fake = FakeRds::new();
        let waiter = ClusterWaiter::new(fake.clone().into_api(), "c1", polling());

        let err = waiter.create_cluster_and_wait().await.unwrap_err();

        assert!(err.is_validation());
        assert!(fake.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_cluster_and_wait() {
        let fake = FakeRds::new();
        fake.script_cluster_statuses("c1", &["creating", "creating", "available"]);
        let waiter = ClusterWaiter::for_creation(fake.clone().into_api(), "c1", config(), polling()).unwrap();

        let info = waiter.create_cluster_and_wait().await.unwrap();

        assert_eq!(info.identifier, "c1");
        assert_eq!(info.status, "available");
        assert_eq!(info.engine, "aurora-postgresql");
        assert_eq!(fake.count(|c| matches!(c, Call::DescribeClusters(_))), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_password_waits_for_pending_change() {
        let fake = FakeRds::new();
        fake.add_cluster(FakeRds::cluster("c1", "available"));
        fake.set_password_apply_delay("c1", 2);
        let waiter = ClusterWaiter::for_creation(fake.clone().into_api(), "c1", config(), polling()).unwrap();

        let info = waiter.update_password_and_wait().await.unwrap();

        assert!(!info.pending_password_change);
        assert!(fake.calls().contains(&Call::ModifyMasterPassword("c1".to_string())));
        assert_eq!(fake.count(|c| matches!(c, Call::DescribeClusters(_))), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_without_wait_does_not_poll() {
        let fake = FakeRds::new();
        fake.add_cluster(FakeRds::cluster("c1", "available"));
        let waiter = ClusterWaiter::new(fake.clone().into_api(), "c1", polling());

        let confirmed = waiter.delete_cluster_and_wait(true, false).await.unwrap();

        assert!(!confirmed);
        assert_eq!(
            fake.calls(),
            vec![Call::DeleteCluster {
                identifier: "c1".to_string(),
                skip_final_snapshot: true
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_with_wait_polls_until_gone() {
        let fake = FakeRds::new();
        fake.add_cluster(FakeRds::cluster("c1", "available"));
        fake.set_delete_delay("c1", 2);
        let waiter = ClusterWaiter::new(fake.clone().into_api(), "c1", polling());

        let confirmed = waiter.delete_cluster_and_wait(true, true).await.unwrap();

        assert!(confirmed);
        assert_eq!(fake.count(|c| matches!(c, Call::DescribeClusters(_))), 3);
    }
}
