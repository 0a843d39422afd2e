//! Database instance waiter

use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use super::{DescribeFuture, Handle, ResourceKind, ResourceWaiter, Target, settle};
use crate::error::{CoreError, Result};
use crate::poller::PollingConfig;
use crate::progress::ProgressCallback;
use crate::provider::{CreateInstanceRequest, RdsApi};
use crate::types::InstanceInfo;

/// Instance resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instance;

impl ResourceKind for Instance {
    type Info = InstanceInfo;

    const NAME: &'static str = "instance";
    const AVAILABLE: &'static [&'static str] = &["available"];
    const FAILED: &'static [&'static str] = &[
        "failed",
        "incompatible-parameters",
        "incompatible-restore",
        "incompatible-network",
        "storage-full",
        "deleting",
        "deleted",
    ];
    const DELETE_FAILED: &'static [&'static str] =
        &["creating", "modifying", "rebooting", "resetting-master-credentials"];

    fn describe<'a>(api: &'a dyn RdsApi, identifier: &'a str) -> DescribeFuture<'a, InstanceInfo> {
        Box::pin(async move { api.describe_instance(identifier).await })
    }
}

/// Where a new instance goes and what it runs on
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceConfig {
    pub cluster_identifier: String,
    pub instance_class: String,
    pub engine: String,
}

impl InstanceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cluster_identifier.trim().is_empty() {
            return Err(CoreError::Validation(
                "parent cluster identifier required to create an instance".to_string(),
            ));
        }
        if self.instance_class.trim().is_empty() {
            return Err(CoreError::Validation(
                "db instance class required to create an instance".to_string(),
            ));
        }
        if self.engine.trim().is_empty() {
            return Err(CoreError::Validation(
                "engine required to create an instance".to_string(),
            ));
        }
        Ok(())
    }
}

/// Create and delete one cluster instance
pub struct InstanceWaiter {
    waiter: ResourceWaiter<Instance>,
    identifier: String,
    config: Option<InstanceConfig>,
    polling: PollingConfig,
    /// Status seen by the last creation wait that did not succeed
    last_status: Mutex<Option<String>>,
}

impl InstanceWaiter {
    /// A waiter for delete/describe use
    pub fn new(api: Arc<dyn RdsApi>, identifier: impl Into<String>, polling: PollingConfig) -> Self {
        Self {
            waiter: ResourceWaiter::new(api),
            identifier: identifier.into(),
            config: None,
            polling,
            last_status: Mutex::new(None),
        }
    }

    /// A waiter that can create the instance; validates `config` up front
    pub fn for_creation(
        api: Arc<dyn RdsApi>,
        identifier: impl Into<String>,
        config: InstanceConfig,
        polling: PollingConfig,
    ) -> Result<Self> {
        let identifier = identifier.into();
        if identifier.trim().is_empty() {
            return Err(CoreError::Validation(
                "instance identifier required".to_string(),
            ));
        }
        config.validate()?;
        polling.validate()?;
        Ok(Self {
            waiter: ResourceWaiter::new(api),
            identifier,
            config: Some(config),
            polling,
            last_status: Mutex::new(None),
        })
    }

    pub fn with_progress(mut self, on_progress: Option<ProgressCallback>) -> Self {
        self.waiter = self.waiter.with_progress(on_progress);
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Last status observed when [`create_instance_and_wait`](Self::create_instance_and_wait)
    /// returned `None`
    pub fn last_status(&self) -> Option<String> {
        self.last_status
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Issue the create-instance request
    pub async fn submit_create(&self) -> Result<Handle<Instance>> {
        let config = self.config.as_ref().ok_or_else(|| {
            CoreError::Validation(format!(
                "instance waiter for '{}' was not built for creation",
                self.identifier
            ))
        })?;
        let request = CreateInstanceRequest {
            instance_identifier: self.identifier.clone(),
            cluster_identifier: config.cluster_identifier.clone(),
            instance_class: config.instance_class.clone(),
            engine: config.engine.clone(),
        };
        info!(
            instance = %self.identifier,
            cluster = %config.cluster_identifier,
            class = %config.instance_class,
            "Creating instance"
        );
        self.waiter.api().create_instance(&request).await?;
        Ok(Handle::new(&self.identifier, Target::Available))
    }

    /// Issue the delete-instance request
    pub async fn submit_delete(&self, skip_snapshot: bool) -> Result<Handle<Instance>> {
        info!(instance = %self.identifier, skip_snapshot, "Deleting instance");
        self.waiter
            .api()
            .delete_instance(&self.identifier, skip_snapshot)
            .await?;
        Ok(Handle::new(&self.identifier, Target::Gone))
    }

    /// Create the instance and block until it is available
    ///
    /// A failed or timed-out wait yields `Ok(None)`: the instance never
    /// became usable and the caller must abort. The status seen last is
    /// kept in [`last_status`](Self::last_status). Errors from the create
    /// request itself are returned as errors.
    pub async fn create_instance_and_wait(&self) -> Result<Option<InstanceInfo>> {
        let handle = self.submit_create().await?;
        let outcome = self.waiter.wait(&handle, &self.polling).await;
        let settled = settle::<Instance>(outcome, &self.identifier, &self.polling);
        let mut last_status = self.last_status.lock().unwrap_or_else(|e| e.into_inner());
        match settled {
            Ok(observed) => {
                *last_status = None;
                Ok(observed.into_present())
            }
            Err(e) => {
                warn!(instance = %self.identifier, error = %e, "Instance never became available");
                *last_status = e.last_status().map(str::to_string);
                Ok(None)
            }
        }
    }

    /// Delete the instance; with `wait` block until it is gone
    ///
    /// Without `wait` the deletion is requested but not confirmed.
    pub async fn delete_instance_and_wait(&self, skip_snapshot: bool, wait: bool) -> Result<bool> {
        let handle = self.submit_delete(skip_snapshot).await?;
        if !wait {
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

    fn config() -> InstanceConfig {
        InstanceConfig {
            cluster_identifier: "c1".to_string(),
            instance_class: "db.r6g.large".to_string(),
            engine: "aurora-postgresql".to_string(),
        }
    }

    fn polling() -> PollingConfig {
        PollingConfig::new(Duration::from_secs(30), 5)
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_instance_and_wait() {
        let fake = FakeRds::new();
        fake.add_cluster(FakeRds::cluster("c1", "available"));
        fake.script_instance_statuses("c1-instance-0", &["creating", "backing-up", "available"]);
        let waiter =
            InstanceWaiter::for_creation(fake.clone().into_api(), "c1-instance-0", config(), polling())
                .unwrap();

        let info = waiter.create_instance_and_wait().await.unwrap().unwrap();

        assert_eq!(info.identifier, "c1-instance-0");
        assert_eq!(info.cluster_identifier.as_deref(), Some("c1"));
        assert_eq!(info.instance_class.as_deref(), Some("db.r6g.large"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_instance_yields_none() {
        let fake = FakeRds::new();
        fake.add_cluster(FakeRds::cluster("c1", "available"));
        fake.script_instance_statuses("c1-instance-0", &["creating", "incompatible-parameters"]);
        let waiter =
            InstanceWaiter::for_creation(fake.clone().into_api(), "c1-instance-0", config(), polling())
                .unwrap();

        let result = waiter.create_instance_and_wait().await.unwrap();

        assert!(result.is_none());
        assert_eq!(waiter.last_status().as_deref(), Some("incompatible-parameters"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_instance_yields_none() {
        let fake = FakeRds::new();
        fake.add_cluster(FakeRds::cluster("c1", "available"));
        fake.script_instance_statuses("c1-instance-0", &["creating"; 10]);
        let waiter =
            InstanceWaiter::for_creation(fake.clone().into_api(), "c1-instance-0", config(), polling())
                .unwrap();

        let result = waiter.create_instance_and_wait().await.unwrap();

        assert!(result.is_none());
        assert_eq!(waiter.last_status().as_deref(), Some("creating"));
        assert_eq!(fake.count(|c| matches!(c, Call::DescribeInstance(_))), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_create_is_an_error() {
        let fake = FakeRds::new();
        fake.fail_on(
            "create_instance",
            crate::ProviderError::Rejected {
                code: Some("InvalidDBClusterStateFault".to_string()),
                message: "cluster not available".to_string(),
            },
        );
        let waiter =
            InstanceWaiter::for_creation(fake.clone().into_api(), "c1-instance-0", config(), polling())
                .unwrap();

        let err = waiter.create_instance_and_wait().await.unwrap_err();

        assert!(matches!(err, CoreError::Provider(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_without_wait_is_fire_and_forget() {
        let fake = FakeRds::new();
        fake.add_instance(FakeRds::instance("c1-instance-0", "c1", "available"));
        let waiter = InstanceWaiter::new(fake.clone().into_api(), "c1-instance-0", polling());

        let confirmed = waiter.delete_instance_and_wait(true, false).await.unwrap();

        assert!(!confirmed);
        assert_eq!(fake.count(|c| matches!(c, Call::DescribeInstance(_))), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_with_wait_confirms_removal() {
        let fake = FakeRds::new();
        fake.add_instance(FakeRds::instance("c1-instance-0", "c1", "available"));
        fake.set_delete_delay("c1-instance-0", 1);
        let waiter = InstanceWaiter::new(fake.clone().into_api(), "c1-instance-0", polling());

        let confirmed = waiter.delete_instance_and_wait(true, true).await.unwrap();

        assert!(confirmed);
        assert_eq!(fake.count(|c| matches!(c, Call::DescribeInstance(_))), 2);
    }

    #[test]
    fn test_instance_config_validation() {
        let mut bad = config();
        bad.instance_class = String::new();
        assert!(bad.validate().unwrap_err().to_string().contains("instance class"));
    }
}
