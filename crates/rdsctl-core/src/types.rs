//! Typed projections of RDS describe responses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Anything the poller can read a status string from
pub trait HasStatus {
    fn identifier(&self) -> &str;
    fn status(&self) -> &str;
}

/// An Aurora cluster as reported by describe-db-clusters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub identifier: String,
    pub status: String,
    pub engine: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub members: Vec<ClusterMember>,
    /// A master password change has been accepted but not yet applied
    #[serde(default)]
    pub pending_password_change: bool,
}

/// An instance attached to a cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterMember {
    pub instance_identifier: String,
    #[serde(default)]
    pub is_writer: bool,
}

/// A database instance as reported by describe-db-instances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceInfo {
    pub identifier: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
}

/// A cluster snapshot as reported by describe-db-cluster-snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub identifier: String,
    /// The cluster this snapshot was taken from
    pub cluster_identifier: String,
    pub status: String,
    pub engine: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_progress: Option<i32>,
}

impl HasStatus for ClusterInfo {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn status(&self) -> &str {
        &self.status
    }
}

impl HasStatus for InstanceInfo {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn status(&self) -> &str {
        &self.status
    }
}

impl HasStatus for SnapshotInfo {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn status(&self) -> &str {
        &self.status
    }
}

/// Derive the identifier of the `index`-th instance of a cluster
pub fn instance_identifier(cluster_identifier: &str, index: usize) -> String {
    format!("{}-instance-{}", cluster_identifier, index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_identifier() {
        assert_eq!(instance_identifier("c1", 0), "c1-instance-0");
        assert_eq!(
            instance_identifier("staging-horizon-a", 2),
            "staging-horizon-a-instance-2"
        );
    }

    #[test]
    fn test_cluster_info_deserializes_with_defaults() {
        let cluster: ClusterInfo = serde_json::from_value(serde_json::json!({
            "identifier": "c1",
            "status": "available",
            "engine": "aurora-postgresql"
        }))
        .unwrap();

        assert!(cluster.members.is_empty());
        assert!(!cluster.pending_password_change);
        assert!(cluster.create_time.is_none());
    }
}
