//! Cluster workflows - multi-step operations
//!
//! These workflows compose the waiters into the restore and destroy
//! sequences. Steps run strictly one after another; a failed step aborts
//! the workflow and nothing already created is rolled back.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::context::WorkflowContext;
use crate::error::{CoreError, Result, Step};
use crate::poller::PollingSettings;
use crate::progress::ProgressCallback;
use crate::provider::RdsApi;
use crate::types::{ClusterInfo, InstanceInfo, SnapshotInfo, instance_identifier};
use crate::waiter::{
    Cluster, ClusterConfig, ClusterWaiter, InstanceConfig, InstanceWaiter, ResourceKind,
    ResourceWaiter, Snapshot, SnapshotWaiter, present,
};

/// Knobs shared by every workflow
#[derive(Clone, Default)]
pub struct WorkflowOptions {
    pub polling: PollingSettings,
    pub on_progress: Option<ProgressCallback>,
}

impl fmt::Debug for WorkflowOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowOptions")
            .field("polling", &self.polling)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

/// Input of [`restore_cluster`]
#[derive(Clone, PartialEq)]
pub struct RestoreRequest {
    /// Defaults to the cluster the snapshot was taken from
    pub cluster_identifier: Option<String>,
    pub snapshot_identifier: String,
    pub db_subnet_group_name: String,
    pub vpc_security_group_id: String,
    pub db_cluster_parameter_group_name: String,
    pub master_password: String,
    pub db_instance_class: String,
}

impl RestoreRequest {
    /// Reject missing input before anything is sent to the provider
    pub fn validate(&self) -> Result<()> {
        if self
            .cluster_identifier
            .as_deref()
            .is_some_and(|id| id.trim().is_empty())
        {
            return Err(CoreError::Validation(
                "cluster identifier must not be empty when given".to_string(),
            ));
        }
        let fields = [
            (
                "snapshot identifier required to specify from which snapshot the cluster should be created",
                &self.snapshot_identifier,
            ),
            ("db subnet group name required", &self.db_subnet_group_name),
            ("vpc security group id required", &self.vpc_security_group_id),
            (
                "db cluster parameter group name required",
                &self.db_cluster_parameter_group_name,
            ),
            ("master password required", &self.master_password),
            ("db instance class required", &self.db_instance_class),
        ];
        for (message, value) in fields {
            if value.trim().is_empty() {
                return Err(CoreError::Validation(message.to_string()));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for RestoreRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestoreRequest")
            .field("cluster_identifier", &self.cluster_identifier)
            .field("snapshot_identifier", &self.snapshot_identifier)
            .field("db_subnet_group_name", &self.db_subnet_group_name)
            .field("vpc_security_group_id", &self.vpc_security_group_id)
            .field(
                "db_cluster_parameter_group_name",
                &self.db_cluster_parameter_group_name,
            )
            .field("master_password", &"***")
            .field("db_instance_class", &self.db_instance_class)
            .finish()
    }
}

/// What [`restore_cluster`] created
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestoreReport {
    pub snapshot_identifier: String,
    pub cluster: ClusterInfo,
    pub instance: InstanceInfo,
}

/// Input of [`destroy_cluster`]
#[derive(Debug, Clone, PartialEq)]
pub struct DestroyRequest {
    pub cluster_identifier: String,
    /// Name of the pre-delete snapshot; defaults to `<cluster>-<timestamp>`
    pub snapshot_identifier: Option<String>,
    /// Block until the cluster is gone
    pub wait: bool,
}

/// What [`destroy_cluster`] did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DestroyReport {
    pub cluster_identifier: String,
    pub snapshot: SnapshotInfo,
    /// Instances whose deletion was requested
    pub deleted_instances: Vec<String>,
    /// `true` only when the cluster was observed to be gone
    pub cluster_deleted: bool,
}

/// Default name of the snapshot taken before a cluster is destroyed
pub fn default_snapshot_identifier(cluster_identifier: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}", cluster_identifier, now.format("%Y-%m-%d-%H%M%S"))
}

/// The caller's cluster identifier, or the snapshot's origin cluster
pub fn resolve_cluster_identifier(explicit: Option<&str>, snapshot: &SnapshotInfo) -> Result<String> {
    match explicit {
        Some(id) => Ok(id.to_string()),
        None if !snapshot.cluster_identifier.is_empty() => {
            info!(
                cluster = %snapshot.cluster_identifier,
                "Using the cluster the snapshot was taken from"
            );
            Ok(snapshot.cluster_identifier.clone())
        }
        None => Err(CoreError::Validation(format!(
            "snapshot '{}' does not name its source cluster; pass a cluster identifier",
            snapshot.identifier
        ))),
    }
}

/// Describe one resource, mapping "not found" to [`CoreError::NotFound`]
async fn lookup<K: ResourceKind>(api: Arc<dyn RdsApi>, identifier: &str) -> Result<K::Info> {
    let observed = ResourceWaiter::<K>::new(api).observe(identifier).await?;
    present::<K>(observed, identifier)
}

/// Restore a cluster from a snapshot with one instance and a fresh password
///
/// Steps: look up the snapshot, restore the cluster and wait until it is
/// available, create `<cluster>-instance-0` and wait, then reset the master
/// password and wait until the change is applied. The cluster engine is
/// taken from the snapshot.
///
/// # Example
///
/// ```rust,ignore
/// use rdsctl_core::{RdsClient, RestoreRequest, WorkflowOptions, restore_cluster};
/// use std::sync::Arc;
///
/// let api = Arc::new(RdsClient::connect(Some("staging"), None).await);
/// let report = restore_cluster(api, &request, &WorkflowOptions::default()).await?;
/// println!("Restored {}", report.cluster.identifier);
/// ```
pub async fn restore_cluster(
    api: Arc<dyn RdsApi>,
    request: &RestoreRequest,
    options: &WorkflowOptions,
) -> Result<RestoreReport> {
    request.validate()?;
    options.polling.provisioning.validate()?;

    let ctx = WorkflowContext::new("restore", &request.snapshot_identifier);

    // Step 1: Snapshot metadata
    let snapshot = ctx
        .step(
            Step::LookupSnapshot,
            lookup::<Snapshot>(api.clone(), &request.snapshot_identifier),
        )
        .await?;
    let cluster_identifier =
        resolve_cluster_identifier(request.cluster_identifier.as_deref(), &snapshot)?;
    ctx.record_cluster(&cluster_identifier);

    let cluster_waiter = ClusterWaiter::for_creation(
        api.clone(),
        &cluster_identifier,
        ClusterConfig {
            snapshot_identifier: request.snapshot_identifier.clone(),
            engine: snapshot.engine.clone(),
            db_subnet_group_name: request.db_subnet_group_name.clone(),
            vpc_security_group_id: request.vpc_security_group_id.clone(),
            db_cluster_parameter_group_name: request.db_cluster_parameter_group_name.clone(),
            master_password: request.master_password.clone(),
        },
        options.polling.provisioning,
    )?
    .with_progress(options.on_progress.clone());

    // Step 2: Cluster
    let cluster = ctx
        .step(Step::CreateCluster, cluster_waiter.create_cluster_and_wait())
        .await?;

    // Step 3: Instance
    let instance_id = instance_identifier(&cluster.identifier, 0);
    let instance_waiter = InstanceWaiter::for_creation(
        api.clone(),
        &instance_id,
        InstanceConfig {
            cluster_identifier: cluster.identifier.clone(),
            instance_class: request.db_instance_class.clone(),
            engine: snapshot.engine.clone(),
        },
        options.polling.provisioning,
    )?
    .with_progress(options.on_progress.clone());

    let instance = ctx
        .step(Step::CreateInstance, async {
            instance_waiter
                .create_instance_and_wait()
                .await?
                .ok_or_else(|| CoreError::InstanceCreationFailed {
                    instance: instance_id.clone(),
                    cluster: cluster.identifier.clone(),
                    last_status: instance_waiter.last_status(),
                })
        })
        .await?;

    // Step 4: Password
    let cluster = ctx
        .step(Step::UpdatePassword, cluster_waiter.update_password_and_wait())
        .await?;

    info!(
        cluster = %cluster.identifier,
        instance = %instance.identifier,
        "Cluster restored"
    );
    Ok(RestoreReport {
        snapshot_identifier: request.snapshot_identifier.clone(),
        cluster,
        instance,
    })
}

/// Snapshot a cluster, then delete its instances and the cluster itself
///
/// The snapshot is always taken and waited for before anything is deleted;
/// this is independent of the provider's own final-snapshot flag, which is
/// suppressed on every delete call. Instance deletions are requested one by
/// one without waiting. The cluster delete is waited on only when
/// `request.wait` is set.
pub async fn destroy_cluster(
    api: Arc<dyn RdsApi>,
    request: &DestroyRequest,
    options: &WorkflowOptions,
) -> Result<DestroyReport> {
    if request.cluster_identifier.trim().is_empty() {
        return Err(CoreError::Validation(
            "cluster identifier required".to_string(),
        ));
    }
    if request
        .snapshot_identifier
        .as_deref()
        .is_some_and(|id| id.trim().is_empty())
    {
        return Err(CoreError::Validation(
            "snapshot identifier must not be empty when given".to_string(),
        ));
    }
    options.polling.snapshot.validate()?;
    options.polling.destructive.validate()?;

    let cluster_identifier = request.cluster_identifier.as_str();
    let ctx = WorkflowContext::new("destroy", cluster_identifier);
    ctx.record_cluster(cluster_identifier);

    // Step 1: Cluster must exist
    let cluster = ctx
        .step(
            Step::LookupCluster,
            lookup::<Cluster>(api.clone(), cluster_identifier),
        )
        .await?;

    // Step 2: Safety snapshot
    let snapshot_identifier = request
        .snapshot_identifier
        .clone()
        .unwrap_or_else(|| default_snapshot_identifier(cluster_identifier, Utc::now()));
    let snapshot_waiter =
        SnapshotWaiter::new(api.clone(), &snapshot_identifier, options.polling.snapshot)
            .with_progress(options.on_progress.clone());
    let snapshot = ctx
        .step(
            Step::CreateSnapshot,
            snapshot_waiter.create_snapshot_and_wait(cluster_identifier),
        )
        .await?;

    // Step 3: Instances, fire-and-forget
    let deleted_instances = ctx
        .step(Step::DeleteInstances, async {
            let mut deleted = Vec::with_capacity(cluster.members.len());
            for member in &cluster.members {
                InstanceWaiter::new(
                    api.clone(),
                    &member.instance_identifier,
                    options.polling.destructive,
                )
                .with_progress(options.on_progress.clone())
                .delete_instance_and_wait(true, false)
                .await?;
                deleted.push(member.instance_identifier.clone());
            }
            Ok(deleted)
        })
        .await?;

    // Step 4: Cluster
    let cluster_waiter =
        ClusterWaiter::new(api.clone(), cluster_identifier, options.polling.destructive)
            .with_progress(options.on_progress.clone());
    let cluster_deleted = ctx
        .step(
            Step::DeleteCluster,
            cluster_waiter.delete_cluster_and_wait(true, request.wait),
        )
        .await?;

    info!(
        cluster = cluster_identifier,
        snapshot = %snapshot.identifier,
        instances = deleted_instances.len(),
        cluster_deleted,
        "Cluster destroyed"
    );
    Ok(DestroyReport {
        cluster_identifier: cluster_identifier.to_string(),
        snapshot,
        deleted_instances,
        cluster_deleted,
    })
}

/// All clusters, or the one named by `cluster_identifier`
///
/// Naming a cluster that does not exist is a [`CoreError::NotFound`].
pub async fn list_clusters(
    api: &dyn RdsApi,
    cluster_identifier: Option<&str>,
) -> Result<Vec<ClusterInfo>> {
    match api.describe_clusters(cluster_identifier).await {
        Ok(clusters) => Ok(clusters),
        Err(e) if e.is_not_found() => Err(CoreError::NotFound {
            kind: Cluster::NAME,
            identifier: cluster_identifier.unwrap_or_default().to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Cluster snapshots, optionally only those taken from one cluster
pub async fn list_snapshots(
    api: &dyn RdsApi,
    cluster_identifier: Option<&str>,
) -> Result<Vec<SnapshotInfo>> {
    Ok(api
        .describe_cluster_snapshots(None, cluster_identifier)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::PollingConfig;
    use crate::testing::{Call, FakeRds};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn options() -> WorkflowOptions {
        let polling = PollingConfig::new(Duration::from_secs(1), 5);
        WorkflowOptions {
            polling: PollingSettings {
                provisioning: polling,
                destructive: polling,
                snapshot: polling,
            },
            on_progress: None,
        }
    }

    fn restore_request(cluster: Option<&str>) -> RestoreRequest {
        RestoreRequest {
            cluster_identifier: cluster.map(str::to_string),
            snapshot_identifier: "snap1".to_string(),
            db_subnet_group_name: "subnets".to_string(),
            vpc_security_group_id: "sg-123".to_string(),
            db_cluster_parameter_group_name: "params".to_string(),
            master_password: "hunter22".to_string(),
            db_instance_class: "db.r6g.large".to_string(),
        }
    }

    fn is_password_call(call: &Call) -> bool {
        matches!(call, Call::ModifyMasterPassword(_))
    }

    #[test]
    fn test_default_snapshot_identifier() {
        let now = Utc.with_ymd_and_hms(2021, 7, 29, 13, 39, 32).unwrap();
        assert_eq!(
            default_snapshot_identifier("staging-horizon-a", now),
            "staging-horizon-a-2021-07-29-133932"
        );
    }

    #[test]
    fn test_resolve_cluster_identifier() {
        let snapshot = FakeRds::snapshot("snap1", "origin", "available");
        assert_eq!(resolve_cluster_identifier(Some("c1"), &snapshot).unwrap(), "c1");
        assert_eq!(resolve_cluster_identifier(None, &snapshot).unwrap(), "origin");

        let orphan = FakeRds::snapshot("snap1", "", "available");
        assert!(resolve_cluster_identifier(None, &orphan).unwrap_err().is_validation());
    }

    #[test]
    fn test_restore_request_debug_redacts_password() {
        let rendered = format!("{:?}", restore_request(None));
        assert!(!rendered.contains("hunter22"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_validates_before_any_call() {
        let fake = FakeRds::new();
        let mut request = restore_request(Some("c1"));
        request.db_instance_class = String::new();

        let err = restore_cluster(fake.clone().into_api(), &request, &options())
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert!(fake.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_full_sequence() {
        let fake = FakeRds::new();
        fake.add_snapshot(FakeRds::snapshot("snap1", "origin", "available"));

        let report = restore_cluster(fake.clone().into_api(), &restore_request(Some("c1")), &options())
            .await
            .unwrap();

        assert_eq!(report.cluster.identifier, "c1");
        assert_eq!(report.instance.identifier, "c1-instance-0");
        assert!(!report.cluster.pending_password_change);

        let restore = fake
            .position(|c| matches!(c, Call::RestoreCluster { .. }))
            .unwrap();
        let create = fake
            .position(|c| matches!(c, Call::CreateInstance { .. }))
            .unwrap();
        let password = fake.position(is_password_call).unwrap();
        assert!(restore < create && create < password);
        assert_eq!(
            fake.calls()[create],
            Call::CreateInstance {
                instance_identifier: "c1-instance-0".to_string(),
                cluster_identifier: "c1".to_string(),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_defaults_to_snapshot_origin_cluster() {
        let fake = FakeRds::new();
        fake.add_snapshot(FakeRds::snapshot("snap1", "staging-horizon-a", "available"));

        let report = restore_cluster(fake.clone().into_api(), &restore_request(None), &options())
            .await
            .unwrap();

        assert_eq!(report.cluster.identifier, "staging-horizon-a");
        assert!(fake.calls().contains(&Call::RestoreCluster {
            cluster_identifier: "staging-horizon-a".to_string(),
            snapshot_identifier: "snap1".to_string(),
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_missing_snapshot_is_not_found() {
        let fake = FakeRds::new();

        let err = restore_cluster(fake.clone().into_api(), &restore_request(Some("c1")), &options())
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.step(), Some(Step::LookupSnapshot));
        assert_eq!(fake.count(|c| matches!(c, Call::RestoreCluster { .. })), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_instance_failure_skips_password() {
        let fake = FakeRds::new();
        fake.add_snapshot(FakeRds::snapshot("snap1", "origin", "available"));
        fake.script_instance_statuses("c1-instance-0", &["creating", "failed"]);

        let err = restore_cluster(fake.clone().into_api(), &restore_request(Some("c1")), &options())
            .await
            .unwrap_err();

        assert_eq!(err.step(), Some(Step::CreateInstance));
        assert!(matches!(err.root(), CoreError::InstanceCreationFailed { .. }));
        assert!(err.to_string().contains("c1-instance-0"));
        assert_eq!(err.last_status(), Some("failed"));
        assert_eq!(fake.count(is_password_call), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_cluster_failure_skips_instance() {
        let fake = FakeRds::new();
        fake.add_snapshot(FakeRds::snapshot("snap1", "origin", "available"));
        fake.script_cluster_statuses("c1", &["creating", "incompatible-restore"]);

        let err = restore_cluster(fake.clone().into_api(), &restore_request(Some("c1")), &options())
            .await
            .unwrap_err();

        assert_eq!(err.step(), Some(Step::CreateCluster));
        assert_eq!(err.last_status(), Some("incompatible-restore"));
        assert_eq!(fake.count(|c| matches!(c, Call::CreateInstance { .. })), 0);
    }

    fn destroy_fixture() -> FakeRds {
        let fake = FakeRds::new();
        fake.add_cluster_with_members(
            FakeRds::cluster("c1", "available"),
            &["c1-instance-0", "c1-instance-1"],
        );
        fake
    }

    fn destroy_request(wait: bool) -> DestroyRequest {
        DestroyRequest {
            cluster_identifier: "c1".to_string(),
            snapshot_identifier: Some("c1-final".to_string()),
            wait,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_snapshots_before_deleting() {
        let fake = destroy_fixture();

        let report = destroy_cluster(fake.clone().into_api(), &destroy_request(false), &options())
            .await
            .unwrap();

        assert_eq!(report.snapshot.identifier, "c1-final");
        assert_eq!(report.deleted_instances, vec!["c1-instance-0", "c1-instance-1"]);
        assert!(!report.cluster_deleted);

        let snapshot = fake
            .position(|c| matches!(c, Call::CreateSnapshot { .. }))
            .unwrap();
        let first_delete = fake
            .position(|c| matches!(c, Call::DeleteInstance { .. } | Call::DeleteCluster { .. }))
            .unwrap();
        assert!(snapshot < first_delete);
        assert!(fake.calls().contains(&Call::DeleteCluster {
            identifier: "c1".to_string(),
            skip_final_snapshot: true,
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_without_wait_does_not_poll_cluster_after_delete() {
        let fake = destroy_fixture();

        destroy_cluster(fake.clone().into_api(), &destroy_request(false), &options())
            .await
            .unwrap();

        let calls = fake.calls();
        let delete = calls
            .iter()
            .position(|c| matches!(c, Call::DeleteCluster { .. }))
            .unwrap();
        assert!(
            !calls[delete..]
                .iter()
                .any(|c| matches!(c, Call::DescribeClusters(_)))
        );
        assert_eq!(fake.count(|c| matches!(c, Call::DescribeInstance(_))), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_with_wait_confirms_removal() {
        let fake = destroy_fixture();
        fake.set_delete_delay("c1", 2);

        let report = destroy_cluster(fake.clone().into_api(), &destroy_request(true), &options())
            .await
            .unwrap();

        assert!(report.cluster_deleted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_failed_snapshot_deletes_nothing() {
        let fake = destroy_fixture();
        fake.script_snapshot_statuses("c1-final", &["creating", "failed"]);

        let err = destroy_cluster(fake.clone().into_api(), &destroy_request(true), &options())
            .await
            .unwrap_err();

        assert_eq!(err.step(), Some(Step::CreateSnapshot));
        assert_eq!(
            fake.count(|c| matches!(c, Call::DeleteInstance { .. } | Call::DeleteCluster { .. })),
            0
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_missing_cluster_is_not_found() {
        let fake = FakeRds::new();

        let err = destroy_cluster(fake.clone().into_api(), &destroy_request(false), &options())
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.step(), Some(Step::LookupCluster));
        assert_eq!(fake.count(|c| matches!(c, Call::CreateSnapshot { .. })), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_rejects_blank_identifiers_before_any_call() {
        let fake = destroy_fixture();
        let blank_cluster = DestroyRequest {
            cluster_identifier: "  ".to_string(),
            ..destroy_request(true)
        };
        let empty_snapshot = DestroyRequest {
            snapshot_identifier: Some(String::new()),
            ..destroy_request(true)
        };

        for request in [blank_cluster, empty_snapshot] {
            let err = destroy_cluster(fake.clone().into_api(), &request, &options())
                .await
                .unwrap_err();
            assert!(err.is_validation(), "unexpected error: {err}");
        }
        assert!(fake.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_default_snapshot_name() {
        let fake = destroy_fixture();
        let request = DestroyRequest {
            snapshot_identifier: None,
            ..destroy_request(false)
        };

        let report = destroy_cluster(fake.into_api(), &request, &options())
            .await
            .unwrap();

        let suffix = report.snapshot.identifier.strip_prefix("c1-").unwrap();
        assert_eq!(suffix.len(), "2021-07-29-133932".len());
    }

    #[tokio::test]
    async fn test_list_clusters() {
        let fake = FakeRds::new();
        fake.add_cluster(FakeRds::cluster("a", "available"));
        fake.add_cluster(FakeRds::cluster("b", "stopped"));

        let all = list_clusters(&fake, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let one = list_clusters(&fake, Some("b")).await.unwrap();
        assert_eq!(one[0].status, "stopped");

        let err = list_clusters(&fake, Some("missing")).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { kind: "cluster", .. }));
    }

    #[tokio::test]
    async fn test_list_snapshots_by_cluster() {
        let fake = FakeRds::new();
        fake.add_snapshot(FakeRds::snapshot("s1", "a", "available"));
        fake.add_snapshot(FakeRds::snapshot("s2", "b", "available"));

        let snapshots = list_snapshots(&fake, Some("a")).await.unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].identifier, "s1");
    }
}
