//! `RdsApi` over `aws-sdk-rds`

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_rds::primitives::DateTime as SdkDateTime;
use aws_sdk_rds::types::{DbCluster, DbClusterSnapshot, DbInstance};
use chrono::{DateTime, Utc};
use tracing::debug;

use super::error::classify_sdk_error;
use crate::provider::{
    CopySnapshotRequest, CreateInstanceRequest, ProviderError, ProviderResult, RdsApi,
    RestoreClusterRequest,
};
use crate::types::{ClusterInfo, ClusterMember, InstanceInfo, SnapshotInfo};

/// Attribute that grants restore permission on a shared snapshot
const RESTORE_ATTRIBUTE: &str = "restore";

/// RDS control-plane client
#[derive(Clone, Debug)]
pub struct RdsClient {
    client: aws_sdk_rds::Client,
}

impl RdsClient {
    /// Load AWS configuration and build a client
    ///
    /// Credentials and region come from the usual SDK chain (environment,
    /// shared config files, instance roles); `profile` and `region`
    /// override it when set.
    pub async fn connect(profile: Option<&str>, region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let config = loader.load().await;
        debug!(
            profile = profile.unwrap_or("default"),
            region = config.region().map(|r| r.as_ref()).unwrap_or("unset"),
            "Loaded AWS configuration"
        );
        Self::from_config(&config)
    }

    /// Build a client from an already loaded SDK config
    pub fn from_config(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_rds::Client::new(config),
        }
    }
}

fn timestamp(value: Option<&SdkDateTime>) -> Option<DateTime<Utc>> {
    value.and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
}

fn text(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

fn missing(what: &str) -> ProviderError {
    ProviderError::Rejected {
        code: None,
        message: format!("response did not include a {}", what),
    }
}

impl From<&DbCluster> for ClusterInfo {
    fn from(cluster: &DbCluster) -> Self {
        ClusterInfo {
            identifier: text(cluster.db_cluster_identifier()),
            status: cluster.status().unwrap_or("unknown").to_string(),
            engine: text(cluster.engine()),
            engine_version: cluster.engine_version().map(str::to_string),
            create_time: timestamp(cluster.cluster_create_time()),
            endpoint: cluster.endpoint().map(str::to_string),
            members: cluster
                .db_cluster_members()
                .iter()
                .map(|m| ClusterMember {
                    instance_identifier: text(m.db_instance_identifier()),
                    is_writer: m.is_cluster_writer().unwrap_or(false),
                })
                .collect(),
            pending_password_change: cluster
                .pending_modified_values()
                .and_then(|p| p.master_user_password())
                .is_some(),
        }
    }
}

impl From<&DbInstance> for InstanceInfo {
    fn from(instance: &DbInstance) -> Self {
        InstanceInfo {
            identifier: text(instance.db_instance_identifier()),
            status: instance.db_instance_status().unwrap_or("unknown").to_string(),
            instance_class: instance.db_instance_class().map(str::to_string),
            cluster_identifier: instance.db_cluster_identifier().map(str::to_string),
            engine: instance.engine().map(str::to_string),
        }
    }
}

impl From<&DbClusterSnapshot> for SnapshotInfo {
    fn from(snapshot: &DbClusterSnapshot) -> Self {
        SnapshotInfo {
            identifier: text(snapshot.db_cluster_snapshot_identifier()),
            cluster_identifier: text(snapshot.db_cluster_identifier()),
            status: snapshot.status().unwrap_or("unknown").to_string(),
            engine: text(snapshot.engine()),
            snapshot_type: snapshot.snapshot_type().map(str::to_string),
            create_time: timestamp(snapshot.snapshot_create_time()),
            percent_progress: snapshot.percent_progress(),
        }
    }
}

#[async_trait]
impl RdsApi for RdsClient {
    async fn describe_clusters(&self, identifier: Option<&str>) -> ProviderResult<Vec<ClusterInfo>> {
        let mut clusters = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let output = self
                .client
                .describe_db_clusters()
                .set_db_cluster_identifier(identifier.map(str::to_string))
                .set_marker(marker.take())
                .send()
                .await
                .map_err(classify_sdk_error)?;
            clusters.extend(output.db_clusters().iter().map(ClusterInfo::from));
            match output.marker() {
                Some(next) if !next.is_empty() => marker = Some(next.to_string()),
                _ => break,
            }
        }
        Ok(clusters)
    }

    async fn describe_cluster_snapshots(
        &self,
        snapshot_identifier: Option<&str>,
        cluster_identifier: Option<&str>,
    ) -> ProviderResult<Vec<SnapshotInfo>> {
        let mut snapshots = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let output = self
                .client
                .describe_db_cluster_snapshots()
                .set_db_cluster_snapshot_identifier(snapshot_identifier.map(str::to_string))
                .set_db_cluster_identifier(cluster_identifier.map(str::to_string))
                .set_marker(marker.take())
                .send()
                .await
                .map_err(classify_sdk_error)?;
            snapshots.extend(output.db_cluster_snapshots().iter().map(SnapshotInfo::from));
            match output.marker() {
                Some(next) if !next.is_empty() => marker = Some(next.to_string()),
                _ => break,
            }
        }
        Ok(snapshots)
    }

    async fn describe_instance(&self, identifier: &str) -> ProviderResult<InstanceInfo> {
        let output = self
            .client
            .describe_db_instances()
            .db_instance_identifier(identifier)
            .send()
            .await
            .map_err(classify_sdk_error)?;
        output
            .db_instances()
            .first()
            .map(InstanceInfo::from)
            .ok_or_else(|| ProviderError::NotFound {
                message: format!("instance {}", identifier),
            })
    }

    async fn restore_cluster_from_snapshot(
        &self,
        request: &RestoreClusterRequest,
    ) -> ProviderResult<ClusterInfo> {
        let output = self
            .client
            .restore_db_cluster_from_snapshot()
            .db_cluster_identifier(&request.cluster_identifier)
            .snapshot_identifier(&request.snapshot_identifier)
            .engine(&request.engine)
            .db_subnet_group_name(&request.db_subnet_group_name)
            .vpc_security_group_ids(&request.vpc_security_group_id)
            .db_cluster_parameter_group_name(&request.db_cluster_parameter_group_name)
            .send()
            .await
            .map_err(classify_sdk_error)?;
        output
            .db_cluster()
            .map(ClusterInfo::from)
            .ok_or_else(|| missing("cluster"))
    }

    async fn create_instance(&self, request: &CreateInstanceRequest) -> ProviderResult<InstanceInfo> {
        let output = self
            .client
            .create_db_instance()
            .db_instance_identifier(&request.instance_identifier)
            .db_cluster_identifier(&request.cluster_identifier)
            .db_instance_class(&request.instance_class)
            .engine(&request.engine)
            .send()
            .await
            .map_err(classify_sdk_error)?;
        output
            .db_instance()
            .map(InstanceInfo::from)
            .ok_or_else(|| missing("db instance"))
    }

    async fn modify_master_password(
        &self,
        cluster_identifier: &str,
        password: &str,
    ) -> ProviderResult<ClusterInfo> {
        let output = self
            .client
            .modify_db_cluster()
            .db_cluster_identifier(cluster_identifier)
            .master_user_password(password)
            .apply_immediately(true)
            .send()
            .await
            .map_err(classify_sdk_error)?;
        output
            .db_cluster()
            .map(ClusterInfo::from)
            .ok_or_else(|| missing("cluster"))
    }

    async fn delete_instance(
        &self,
        identifier: &str,
        skip_final_snapshot: bool,
    ) -> ProviderResult<InstanceInfo> {
        let output = self
            .client
            .delete_db_instance()
            .db_instance_identifier(identifier)
            .skip_final_snapshot(skip_final_snapshot)
            .send()
            .await
            .map_err(classify_sdk_error)?;
        output
            .db_instance()
            .map(InstanceInfo::from)
            .ok_or_else(|| missing("db instance"))
    }

    async fn delete_cluster(
        &self,
        identifier: &str,
        skip_final_snapshot: bool,
    ) -> ProviderResult<ClusterInfo> {
        let final_snapshot = (!skip_final_snapshot).then(|| format!("{}-final-snapshot", identifier));
        let output = self
            .client
            .delete_db_cluster()
            .db_cluster_identifier(identifier)
            .skip_final_snapshot(skip_final_snapshot)
            .set_final_db_snapshot_identifier(final_snapshot)
            .send()
            .await
            .map_err(classify_sdk_error)?;
        output
            .db_cluster()
            .map(ClusterInfo::from)
            .ok_or_else(|| missing("cluster"))
    }

    async fn create_cluster_snapshot(
        &self,
        cluster_identifier: &str,
        snapshot_identifier: &str,
    ) -> ProviderResult<SnapshotInfo> {
        let output = self
            .client
            .create_db_cluster_snapshot()
            .db_cluster_identifier(cluster_identifier)
            .db_cluster_snapshot_identifier(snapshot_identifier)
            .send()
            .await
            .map_err(classify_sdk_error)?;
        output
            .db_cluster_snapshot()
            .map(SnapshotInfo::from)
            .ok_or_else(|| missing("cluster snapshot"))
    }

    async fn copy_cluster_snapshot(&self, request: &CopySnapshotRequest) -> ProviderResult<SnapshotInfo> {
        let output = self
            .client
            .copy_db_cluster_snapshot()
            .source_db_cluster_snapshot_identifier(&request.source_snapshot_identifier)
            .target_db_cluster_snapshot_identifier(&request.target_snapshot_identifier)
            .set_kms_key_id(request.kms_key_id.clone())
            .send()
            .await
            .map_err(classify_sdk_error)?;
        output
            .db_cluster_snapshot()
            .map(SnapshotInfo::from)
            .ok_or_else(|| missing("cluster snapshot"))
    }

    async fn delete_cluster_snapshot(&self, identifier: &str) -> ProviderResult<SnapshotInfo> {
        let output = self
            .client
            .delete_db_cluster_snapshot()
            .db_cluster_snapshot_identifier(identifier)
            .send()
            .await
            .map_err(classify_sdk_error)?;
        output
            .db_cluster_snapshot()
            .map(SnapshotInfo::from)
            .ok_or_else(|| missing("cluster snapshot"))
    }

    async fn share_cluster_snapshot(&self, identifier: &str, account_id: &str) -> ProviderResult<()> {
        self.client
            .modify_db_cluster_snapshot_attribute()
            .db_cluster_snapshot_identifier(identifier)
            .attribute_name(RESTORE_ATTRIBUTE)
            .values_to_add(account_id)
            .send()
            .await
            .map_err(classify_sdk_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_rds::types::{ClusterPendingModifiedValues, DbClusterMember};

    #[test]
    fn test_cluster_conversion() {
        let cluster = DbCluster::builder()
            .db_cluster_identifier("staging-horizon-a")
            .status("available")
            .engine("aurora-postgresql")
            .cluster_create_time(SdkDateTime::from_secs(1_627_565_972))
            .db_cluster_members(
                DbClusterMember::builder()
                    .db_instance_identifier("staging-horizon-a-instance-0")
                    .is_cluster_writer(true)
                    .build(),
            )
            .build();

        let info = ClusterInfo::from(&cluster);

        assert_eq!(info.identifier, "staging-horizon-a");
        assert_eq!(info.engine, "aurora-postgresql");
        assert_eq!(
            info.create_time.map(|t| t.to_rfc3339()),
            Some("2021-07-29T13:39:32+00:00".to_string())
        );
        assert_eq!(info.members.len(), 1);
        assert!(info.members[0].is_writer);
        assert!(!info.pending_password_change);
    }

    #[test]
    fn test_pending_password_is_detected() {
        let cluster = DbCluster::builder()
            .db_cluster_identifier("c1")
            .status("available")
            .pending_modified_values(
                ClusterPendingModifiedValues::builder()
                    .master_user_password("****")
                    .build(),
            )
            .build();

        assert!(ClusterInfo::from(&cluster).pending_password_change);
    }

    #[test]
    fn test_missing_status_is_unknown() {
        let instance = DbInstance::builder().db_instance_identifier("i1").build();
        assert_eq!(InstanceInfo::from(&instance).status, "unknown");
    }
}
