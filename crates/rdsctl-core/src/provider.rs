//! The RDS control-plane seam
//!
//! Every remote call the waiters and workflows make goes through [`RdsApi`].
//! [`crate::aws::RdsClient`] implements it over `aws-sdk-rds`; tests use an
//! in-memory fake.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

use crate::types::{ClusterInfo, InstanceInfo, SnapshotInfo};

/// Transport-level failures reported by the provider
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The referenced resource does not exist (yet, or any more)
    #[error("Resource not found: {message}")]
    NotFound { message: String },

    /// Rate limit exceeded
    #[error("Request throttled: {message}")]
    Throttled { message: String },

    /// The provider rejected the request (bad parameters, auth, state)
    #[error("{}{message}", code_prefix(.code))]
    Rejected {
        code: Option<String>,
        message: String,
    },

    /// The request never reached the provider or timed out in flight
    #[error("Connection error: {message}")]
    Connection { message: String },
}

fn code_prefix(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| format!("{}: ", c))
        .unwrap_or_default()
}

/// Result type for provider calls
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

impl ProviderError {
    /// Returns true if this is a "not found" error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound { .. })
    }

    /// Returns true if a status fetch failing this way may succeed later
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Throttled { .. } | ProviderError::Connection { .. }
        )
    }

    /// The provider error code, when one was reported
    pub fn code(&self) -> Option<&str> {
        match self {
            ProviderError::Rejected { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// Parameters for restoring a cluster from a cluster snapshot
#[derive(Clone, PartialEq)]
pub struct RestoreClusterRequest {
    pub cluster_identifier: String,
    pub snapshot_identifier: String,
    pub engine: String,
    pub db_subnet_group_name: String,
    pub vpc_security_group_id: String,
    pub db_cluster_parameter_group_name: String,
}

impl fmt::Debug for RestoreClusterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestoreClusterRequest")
            .field("cluster_identifier", &self.cluster_identifier)
            .field("snapshot_identifier", &self.snapshot_identifier)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

/// Parameters for creating an instance inside an existing cluster
#[derive(Debug, Clone, PartialEq)]
pub struct CreateInstanceRequest {
    pub instance_identifier: String,
    pub cluster_identifier: String,
    pub instance_class: String,
    pub engine: String,
}

/// Parameters for copying a cluster snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct CopySnapshotRequest {
    pub source_snapshot_identifier: String,
    pub target_snapshot_identifier: String,
    /// Key ID, key ARN, alias name or alias ARN to encrypt the copy with
    pub kms_key_id: Option<String>,
}

/// Remote operations against the RDS control plane
#[async_trait]
pub trait RdsApi: Send + Sync {
    /// Describe all clusters, or a single one when `identifier` is set
    async fn describe_clusters(&self, identifier: Option<&str>) -> ProviderResult<Vec<ClusterInfo>>;

    /// Describe one cluster; `NotFound` if it does not exist
    async fn describe_cluster(&self, identifier: &str) -> ProviderResult<ClusterInfo> {
        self.describe_clusters(Some(identifier))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NotFound {
                message: format!("cluster {}", identifier),
            })
    }

    /// Describe cluster snapshots, optionally filtered by snapshot or source cluster
    async fn describe_cluster_snapshots(
        &self,
        snapshot_identifier: Option<&str>,
        cluster_identifier: Option<&str>,
    ) -> ProviderResult<Vec<SnapshotInfo>>;

    /// Describe one cluster snapshot; `NotFound` if it does not exist
    async fn describe_cluster_snapshot(&self, identifier: &str) -> ProviderResult<SnapshotInfo> {
        self.describe_cluster_snapshots(Some(identifier), None)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NotFound {
                message: format!("snapshot {}", identifier),
            })
    }

    /// Describe one instance; `NotFound` if it does not exist
    async fn describe_instance(&self, identifier: &str) -> ProviderResult<InstanceInfo>;

    async fn restore_cluster_from_snapshot(
        &self,
        request: &RestoreClusterRequest,
    ) -> ProviderResult<ClusterInfo>;

    async fn create_instance(&self, request: &CreateInstanceRequest) -> ProviderResult<InstanceInfo>;

    /// Reset the master password, applied immediately
    async fn modify_master_password(
        &self,
        cluster_identifier: &str,
        password: &str,
    ) -> ProviderResult<ClusterInfo>;

    async fn delete_instance(
        &self,
        identifier: &str,
        skip_final_snapshot: bool,
    ) -> ProviderResult<InstanceInfo>;

    /// Delete a cluster. With `skip_final_snapshot == false` the provider
    /// takes its own final snapshot before removing the cluster.
    async fn delete_cluster(
        &self,
        identifier: &str,
        skip_final_snapshot: bool,
    ) -> ProviderResult<ClusterInfo>;

    async fn create_cluster_snapshot(
        &self,
        cluster_identifier: &str,
        snapshot_identifier: &str,
    ) -> ProviderResult<SnapshotInfo>;

    async fn copy_cluster_snapshot(&self, request: &CopySnapshotRequest) -> ProviderResult<SnapshotInfo>;

    async fn delete_cluster_snapshot(&self, identifier: &str) -> ProviderResult<SnapshotInfo>;

    /// Grant another account permission to restore from a snapshot
    async fn share_cluster_snapshot(&self, identifier: &str, account_id: &str) -> ProviderResult<()>;
}
