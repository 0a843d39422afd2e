//! In-memory RDS provider for tests
//!
//! `FakeRds` keeps clusters, instances and snapshots in memory, records every
//! call in order, and serves scripted status sequences so waiters can be
//! exercised without AWS.
//!
//! Status rules:
//! - a describe pops the next scripted status for that resource, if any;
//! - a resource created through the API with no script becomes `available`
//!   on its first describe;
//! - deleted resources report `deleting` for the configured number of
//!   describes, then not-found.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::provider::{
    CopySnapshotRequest, CreateInstanceRequest, ProviderError, ProviderResult, RdsApi,
    RestoreClusterRequest,
};
use crate::types::{ClusterInfo, ClusterMember, InstanceInfo, SnapshotInfo};

/// One recorded provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    DescribeClusters(Option<String>),
    DescribeSnapshots {
        snapshot: Option<String>,
        cluster: Option<String>,
    },
    DescribeInstance(String),
    RestoreCluster {
        cluster_identifier: String,
        snapshot_identifier: String,
    },
    CreateInstance {
        instance_identifier: String,
        cluster_identifier: String,
    },
    ModifyMasterPassword(String),
    DeleteInstance {
        identifier: String,
        skip_final_snapshot: bool,
    },
    DeleteCluster {
        identifier: String,
        skip_final_snapshot: bool,
    },
    CreateSnapshot {
        cluster_identifier: String,
        snapshot_identifier: String,
    },
    CopySnapshot {
        source: String,
        target: String,
        kms_key_id: Option<String>,
    },
    DeleteSnapshot(String),
    ShareSnapshot {
        identifier: String,
        account_id: String,
    },
}

#[derive(Default)]
struct FakeState {
    calls: Vec<Call>,
    clusters: BTreeMap<String, ClusterInfo>,
    instances: BTreeMap<String, InstanceInfo>,
    snapshots: BTreeMap<String, SnapshotInfo>,
    scripts: HashMap<String, VecDeque<String>>,
    created: HashSet<String>,
    deleting: HashMap<String, u32>,
    delete_delays: HashMap<String, u32>,
    password_delays: HashMap<String, u32>,
    pending_password: HashMap<String, u32>,
    failures: HashMap<&'static str, ProviderError>,
}

impl FakeState {
    /// Advance the scripted status of `identifier`; returns the new status
    fn advance(&mut self, identifier: &str, current: &str) -> String {
        if let Some(next) = self.scripts.get_mut(identifier).and_then(|q| q.pop_front()) {
            self.created.remove(identifier);
            return next;
        }
        if self.created.remove(identifier) {
            return "available".to_string();
        }
        current.to_string()
    }

    /// Count down a pending deletion; `true` once the resource is gone
    fn deletion_finished(&mut self, identifier: &str) -> Option<bool> {
        let remaining = self.deleting.get_mut(identifier)?;
        if *remaining == 0 {
            self.deleting.remove(identifier);
            Some(true)
        } else {
            *remaining -= 1;
            Some(false)
        }
    }

    fn check_failure(&self, op: &'static str) -> ProviderResult<()> {
        match self.failures.get(op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn not_found(kind: &str, identifier: &str) -> ProviderError {
    ProviderError::NotFound {
        message: format!("{} {} not found", kind, identifier),
    }
}

/// Cloneable handle to shared fake provider state
#[derive(Clone, Default)]
pub struct FakeRds {
    state: Arc<Mutex<FakeState>>,
}

impl FakeRds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_api(self) -> Arc<dyn RdsApi> {
        Arc::new(self)
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// A cluster fixture with a fixed create time
    pub fn cluster(identifier: &str, status: &str) -> ClusterInfo {
        ClusterInfo {
            identifier: identifier.to_string(),
            status: status.to_string(),
            engine: "aurora-postgresql".to_string(),
            engine_version: Some("13.7".to_string()),
            create_time: Utc.with_ymd_and_hms(2021, 7, 29, 13, 39, 32).single(),
            endpoint: None,
            members: Vec::new(),
            pending_password_change: false,
        }
    }

    pub fn instance(identifier: &str, cluster: &str, status: &str) -> InstanceInfo {
        InstanceInfo {
            identifier: identifier.to_string(),
            status: status.to_string(),
            instance_class: Some("db.r6g.large".to_string()),
            cluster_identifier: Some(cluster.to_string()),
            engine: Some("aurora-postgresql".to_string()),
        }
    }

    pub fn snapshot(identifier: &str, cluster: &str, status: &str) -> SnapshotInfo {
        SnapshotInfo {
            identifier: identifier.to_string(),
            cluster_identifier: cluster.to_string(),
            status: status.to_string(),
            engine: "aurora-postgresql".to_string(),
            snapshot_type: Some("manual".to_string()),
            create_time: Utc.with_ymd_and_hms(2021, 7, 29, 13, 39, 32).single(),
            percent_progress: Some(100),
        }
    }

    pub fn add_cluster(&self, cluster: ClusterInfo) {
        self.state().clusters.insert(cluster.identifier.clone(), cluster);
    }

    /// Add a cluster together with member instances
    pub fn add_cluster_with_members(&self, mut cluster: ClusterInfo, members: &[&str]) {
        let mut state = self.state();
        for (i, member) in members.iter().enumerate() {
            cluster.members.push(ClusterMember {
                instance_identifier: member.to_string(),
                is_writer: i == 0,
            });
            state.instances.insert(
                member.to_string(),
                Self::instance(member, &cluster.identifier, "available"),
            );
        }
        state.clusters.insert(cluster.identifier.clone(), cluster);
    }

    pub fn add_instance(&self, instance: InstanceInfo) {
        self.state().instances.insert(instance.identifier.clone(), instance);
    }

    pub fn add_snapshot(&self, snapshot: SnapshotInfo) {
        self.state().snapshots.insert(snapshot.identifier.clone(), snapshot);
    }

    fn script(&self, identifier: &str, statuses: &[&str]) {
        self.state().scripts.insert(
            identifier.to_string(),
            statuses.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn script_cluster_statuses(&self, identifier: &str, statuses: &[&str]) {
        self.script(identifier, statuses);
    }

    pub fn script_instance_statuses(&self, identifier: &str, statuses: &[&str]) {
        self.script(identifier, statuses);
    }

    pub fn script_snapshot_statuses(&self, identifier: &str, statuses: &[&str]) {
        self.script(identifier, statuses);
    }

    /// Deleted resources report `deleting` for `describes` describe calls
    pub fn set_delete_delay(&self, identifier: &str, describes: u32) {
        self.state()
            .delete_delays
            .insert(identifier.to_string(), describes);
    }

    /// A password change stays pending for `describes` describe calls
    pub fn set_password_apply_delay(&self, identifier: &str, describes: u32) {
        self.state()
            .password_delays
            .insert(identifier.to_string(), describes);
    }

    /// Make every call of operation `op` fail with `err`
    pub fn fail_on(&self, op: &'static str, err: ProviderError) {
        self.state().failures.insert(op, err);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state().calls.iter().filter(|c| pred(c)).count()
    }

    /// Index of the first call matching `pred`
    pub fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.state().calls.iter().position(pred)
    }

    fn describe_one_cluster(state: &mut FakeState, identifier: &str) -> ProviderResult<ClusterInfo> {
        if let Some(done) = state.deletion_finished(identifier) {
            if done {
                state.clusters.remove(identifier);
                return Err(not_found("cluster", identifier));
            }
            if let Some(cluster) = state.clusters.get_mut(identifier) {
                cluster.status = "deleting".to_string();
            }
        } else if let Some(current) = state.clusters.get(identifier).map(|c| c.status.clone()) {
            let next = state.advance(identifier, &current);
            if let Some(cluster) = state.clusters.get_mut(identifier) {
                cluster.status = next;
            }
        }

        let pending = match state.pending_password.get(identifier).copied() {
            Some(0) => {
                state.pending_password.remove(identifier);
                false
            }
            Some(remaining) => {
                state
                    .pending_password
                    .insert(identifier.to_string(), remaining - 1);
                true
            }
            None => false,
        };

        let cluster = state
            .clusters
            .get_mut(identifier)
            .ok_or_else(|| not_found("cluster", identifier))?;
        cluster.pending_password_change = pending;
        Ok(cluster.clone())
    }
}

#[async_trait]
impl RdsApi for FakeRds {
    async fn describe_clusters(&self, identifier: Option<&str>) -> ProviderResult<Vec<ClusterInfo>> {
        let mut state = self.state();
        state
            .calls
            .push(Call::DescribeClusters(identifier.map(str::to_string)));
        state.check_failure("describe_clusters")?;
        match identifier {
            Some(id) => Ok(vec![Self::describe_one_cluster(&mut state, id)?]),
            None => Ok(state.clusters.values().cloned().collect()),
        }
    }

    async fn describe_cluster_snapshots(
        &self,
        snapshot_identifier: Option<&str>,
        cluster_identifier: Option<&str>,
    ) -> ProviderResult<Vec<SnapshotInfo>> {
        let mut state = self.state();
        state.calls.push(Call::DescribeSnapshots {
            snapshot: snapshot_identifier.map(str::to_string),
            cluster: cluster_identifier.map(str::to_string),
        });
        state.check_failure("describe_cluster_snapshots")?;

        if let Some(id) = snapshot_identifier {
            if let Some(done) = state.deletion_finished(id) {
                if done {
                    state.snapshots.remove(id);
                    return Err(not_found("snapshot", id));
                }
            }
            let current = state
                .snapshots
                .get(id)
                .map(|s| s.status.clone())
                .ok_or_else(|| not_found("snapshot", id))?;
            let next = state.advance(id, &current);
            if let Some(snapshot) = state.snapshots.get_mut(id) {
                snapshot.status = next;
            }
        }

        Ok(state
            .snapshots
            .values()
            .filter(|s| snapshot_identifier.is_none_or(|id| s.identifier == id))
            .filter(|s| cluster_identifier.is_none_or(|id| s.cluster_identifier == id))
            .cloned()
            .collect())
    }

    async fn describe_instance(&self, identifier: &str) -> ProviderResult<InstanceInfo> {
        let mut state = self.state();
        state
            .calls
            .push(Call::DescribeInstance(identifier.to_string()));
        state.check_failure("describe_instance")?;

        if let Some(done) = state.deletion_finished(identifier) {
            if done {
                state.instances.remove(identifier);
                return Err(not_found("instance", identifier));
            }
            if let Some(instance) = state.instances.get_mut(identifier) {
                instance.status = "deleting".to_string();
            }
        } else if let Some(current) = state.instances.get(identifier).map(|i| i.status.clone()) {
            let next = state.advance(identifier, &current);
            if let Some(instance) = state.instances.get_mut(identifier) {
                instance.status = next;
            }
        }

        state
            .instances
            .get(identifier)
            .cloned()
            .ok_or_else(|| not_found("instance", identifier))
    }

    async fn restore_cluster_from_snapshot(
        &self,
        request: &RestoreClusterRequest,
    ) -> ProviderResult<ClusterInfo> {
        let mut state = self.state();
        state.calls.push(Call::RestoreCluster {
            cluster_identifier: request.cluster_identifier.clone(),
            snapshot_identifier: request.snapshot_identifier.clone(),
        });
        state.check_failure("restore_cluster_from_snapshot")?;

        let mut cluster = Self::cluster(&request.cluster_identifier, "creating");
        cluster.engine = request.engine.clone();
        cluster.create_time = None;
        state.created.insert(cluster.identifier.clone());
        state
            .clusters
            .insert(cluster.identifier.clone(), cluster.clone());
        Ok(cluster)
    }

    async fn create_instance(&self, request: &CreateInstanceRequest) -> ProviderResult<InstanceInfo> {
        let mut state = self.state();
        state.calls.push(Call::CreateInstance {
            instance_identifier: request.instance_identifier.clone(),
            cluster_identifier: request.cluster_identifier.clone(),
        });
        state.check_failure("create_instance")?;

        let instance = InstanceInfo {
            identifier: request.instance_identifier.clone(),
            status: "creating".to_string(),
            instance_class: Some(request.instance_class.clone()),
            cluster_identifier: Some(request.cluster_identifier.clone()),
            engine: Some(request.engine.clone()),
        };
        state.created.insert(instance.identifier.clone());
        state
            .instances
            .insert(instance.identifier.clone(), instance.clone());
        if let Some(cluster) = state.clusters.get_mut(&request.cluster_identifier) {
            cluster.members.push(ClusterMember {
                instance_identifier: request.instance_identifier.clone(),
                is_writer: cluster.members.is_empty(),
            });
        }
        Ok(instance)
    }

    async fn modify_master_password(
        &self,
        cluster_identifier: &str,
        _password: &str,
    ) -> ProviderResult<ClusterInfo> {
        let mut state = self.state();
        state
            .calls
            .push(Call::ModifyMasterPassword(cluster_identifier.to_string()));
        state.check_failure("modify_master_password")?;

        let delay = state
            .password_delays
            .get(cluster_identifier)
            .copied()
            .unwrap_or(0);
        let cluster = state
            .clusters
            .get_mut(cluster_identifier)
            .ok_or_else(|| not_found("cluster", cluster_identifier))?;
        cluster.pending_password_change = true;
        let cluster = cluster.clone();
        state
            .pending_password
            .insert(cluster_identifier.to_string(), delay);
        Ok(cluster)
    }

    async fn delete_instance(
        &self,
        identifier: &str,
        skip_final_snapshot: bool,
    ) -> ProviderResult<InstanceInfo> {
        let mut state = self.state();
        state.calls.push(Call::DeleteInstance {
            identifier: identifier.to_string(),
            skip_final_snapshot,
        });
        state.check_failure("delete_instance")?;

        let delay = state.delete_delays.get(identifier).copied().unwrap_or(0);
        let instance = state
            .instances
            .get_mut(identifier)
            .ok_or_else(|| not_found("instance", identifier))?;
        instance.status = "deleting".to_string();
        let instance = instance.clone();
        state.deleting.insert(identifier.to_string(), delay);
        Ok(instance)
    }

    async fn delete_cluster(
        &self,
        identifier: &str,
        skip_final_snapshot: bool,
    ) -> ProviderResult<ClusterInfo> {
        let mut state = self.state();
        state.calls.push(Call::DeleteCluster {
            identifier: identifier.to_string(),
            skip_final_snapshot,
        });
        state.check_failure("delete_cluster")?;

        let delay = state.delete_delays.get(identifier).copied().unwrap_or(0);
        let cluster = state
            .clusters
            .get_mut(identifier)
            .ok_or_else(|| not_found("cluster", identifier))?;
        cluster.status = "deleting".to_string();
        let cluster = cluster.clone();
        state.deleting.insert(identifier.to_string(), delay);
        Ok(cluster)
    }

    async fn create_cluster_snapshot(
        &self,
        cluster_identifier: &str,
        snapshot_identifier: &str,
    ) -> ProviderResult<SnapshotInfo> {
        let mut state = self.state();
        state.calls.push(Call::CreateSnapshot {
            cluster_identifier: cluster_identifier.to_string(),
            snapshot_identifier: snapshot_identifier.to_string(),
        });
        state.check_failure("create_cluster_snapshot")?;

        let engine = state
            .clusters
            .get(cluster_identifier)
            .map(|c| c.engine.clone())
            .ok_or_else(|| not_found("cluster", cluster_identifier))?;
        let mut snapshot = Self::snapshot(snapshot_identifier, cluster_identifier, "creating");
        snapshot.engine = engine;
        snapshot.percent_progress = Some(0);
        state.created.insert(snapshot.identifier.clone());
        state
            .snapshots
            .insert(snapshot.identifier.clone(), snapshot.clone());
        Ok(snapshot)
    }

    async fn copy_cluster_snapshot(&self, request: &CopySnapshotRequest) -> ProviderResult<SnapshotInfo> {
        let mut state = self.state();
        state.calls.push(Call::CopySnapshot {
            source: request.source_snapshot_identifier.clone(),
            target: request.target_snapshot_identifier.clone(),
            kms_key_id: request.kms_key_id.clone(),
        });
        state.check_failure("copy_cluster_snapshot")?;

        let source = state
            .snapshots
            .get(&request.source_snapshot_identifier)
            .cloned()
            .ok_or_else(|| not_found("snapshot", &request.source_snapshot_identifier))?;
        let snapshot = SnapshotInfo {
            identifier: request.target_snapshot_identifier.clone(),
            status: "copying".to_string(),
            ..source
        };
        state.created.insert(snapshot.identifier.clone());
        state
            .snapshots
            .insert(snapshot.identifier.clone(), snapshot.clone());
        Ok(snapshot)
    }

    async fn delete_cluster_snapshot(&self, identifier: &str) -> ProviderResult<SnapshotInfo> {
        let mut state = self.state();
        state
            .calls
            .push(Call::DeleteSnapshot(identifier.to_string()));
        state.check_failure("delete_cluster_snapshot")?;

        let delay = state.delete_delays.get(identifier).copied().unwrap_or(0);
        let snapshot = state
            .snapshots
            .get_mut(identifier)
            .ok_or_else(|| not_found("snapshot", identifier))?;
        snapshot.status = "deleting".to_string();
        let snapshot = snapshot.clone();
        state.deleting.insert(identifier.to_string(), delay);
        Ok(snapshot)
    }

    async fn share_cluster_snapshot(&self, identifier: &str, account_id: &str) -> ProviderResult<()> {
        let mut state = self.state();
        state.calls.push(Call::ShareSnapshot {
            identifier: identifier.to_string(),
            account_id: account_id.to_string(),
        });
        state.check_failure("share_cluster_snapshot")?;

        if state.snapshots.contains_key(identifier) {
            Ok(())
        } else {
            Err(not_found("snapshot", identifier))
        }
    }
}
