//! # rdsctl-core
//!
//! Shared engine for `rdsctl`: everything needed to restore, snapshot and
//! destroy Aurora clusters, independent of how results are presented.
//!
//! ## Layers
//!
//! - [`poller`]: generic "fetch status until success, failure or timeout"
//! - [`waiter`]: one generic [`ResourceWaiter`] over cluster, instance and
//!   snapshot kinds, with `*_and_wait` facades per kind
//! - [`workflows`]: the multi-step restore and destroy sequences
//! - [`provider`]: the [`RdsApi`] trait every remote call goes through;
//!   [`aws::RdsClient`] implements it over `aws-sdk-rds`
//!
//! Progress is reported through an optional [`ProgressCallback`]; logging
//! goes through `tracing`, with one span per workflow and per step.
//!
//! ## Crate Structure
//!
//! ```text
//! rdsctl-core/
//! ├── src/
//! │   ├── lib.rs
//! │   ├── aws/          # RdsClient, SDK error classification
//! │   ├── config/       # TOML config, polling overrides
//! │   ├── context.rs    # per-workflow tracing span
//! │   ├── error.rs      # CoreError, Step
//! │   ├── poller.rs     # poll, PollingConfig, WaitOutcome
//! │   ├── progress.rs   # ProgressEvent, ProgressCallback
//! │   ├── provider.rs   # RdsApi, ProviderError
//! │   ├── types.rs      # ClusterInfo, InstanceInfo, SnapshotInfo
//! │   ├── waiter/       # ResourceWaiter and per-kind facades
//! │   └── workflows.rs  # restore_cluster, destroy_cluster
//! ```

pub mod aws;
pub mod config;
pub mod context;
pub mod error;
pub mod poller;
pub mod progress;
pub mod provider;
pub mod types;
pub mod waiter;
pub mod workflows;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use aws::RdsClient;
pub use config::{Config, ConfigError};
pub use context::WorkflowContext;
pub use error::{CoreError, Result, Step};
pub use poller::{PollingConfig, PollingSettings, WaitOutcome, poll};
pub use progress::{ProgressCallback, ProgressEvent};
pub use provider::{ProviderError, ProviderResult, RdsApi};
pub use types::{ClusterInfo, ClusterMember, HasStatus, InstanceInfo, SnapshotInfo};
pub use waiter::{
    ClusterConfig, ClusterWaiter, Handle, InstanceConfig, InstanceWaiter, Observed,
    ResourceWaiter, SnapshotWaiter, Target,
};
pub use workflows::{
    DestroyReport, DestroyRequest, RestoreReport, RestoreRequest, WorkflowOptions,
    default_snapshot_identifier, destroy_cluster, list_clusters, list_snapshots,
    restore_cluster,
};
