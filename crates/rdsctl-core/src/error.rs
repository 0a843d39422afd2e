//! Unified error handling for rdsctl-core
//!
//! Lower layers (poller, waiters) produce typed outcomes; workflows wrap
//! any failure with the step it happened in so the CLI can report it.
//!
//! # Example
//!
//! ```rust
//! use rdsctl_core::{CoreError, ProviderError};
//!
//! let err: CoreError = ProviderError::Throttled {
//!     message: "Rate exceeded".to_string(),
//! }
//! .into();
//! assert!(err.is_retryable());
//! assert!(!err.is_not_found());
//! ```

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;
use crate::provider::ProviderError;

/// Core error type for waiters and workflows
#[derive(Error, Debug)]
pub enum CoreError {
    /// Required identifier or config missing; raised before any remote call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced resource does not exist
    #[error("{kind} '{identifier}' not found")]
    NotFound {
        kind: &'static str,
        identifier: String,
    },

    /// Poller exhausted its attempts without a terminal status
    #[error(
        "Timed out waiting for {kind} '{identifier}' after {attempts} attempts ({waited:?}){}",
        last_status_suffix(.last_status)
    )]
    WaitTimeout {
        kind: &'static str,
        identifier: String,
        attempts: u32,
        waited: Duration,
        last_status: Option<String>,
    },

    /// Poller observed a terminal failure status or persistent transport errors
    #[error("Waiting for {kind} '{identifier}' failed: {reason}")]
    WaitFailed {
        kind: &'static str,
        identifier: String,
        reason: String,
        last_status: Option<String>,
    },

    /// The instance never became usable
    #[error("Failed to create db instance {instance} for cluster {cluster}")]
    InstanceCreationFailed {
        instance: String,
        cluster: String,
        last_status: Option<String>,
    },

    /// A provider call was rejected or could not be delivered
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A workflow step failed; everything after it was skipped
    #[error("{workflow} failed at step '{step}': {source}")]
    Step {
        workflow: &'static str,
        step: Step,
        #[source]
        source: Box<CoreError>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

fn last_status_suffix(status: &Option<String>) -> String {
    status
        .as_deref()
        .map(|s| format!(", last status '{}'", s))
        .unwrap_or_default()
}

/// Steps of the restore and destroy workflows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    LookupSnapshot,
    CreateCluster,
    CreateInstance,
    UpdatePassword,
    LookupCluster,
    CreateSnapshot,
    DeleteInstances,
    DeleteCluster,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::LookupSnapshot => "lookup-snapshot",
            Step::CreateCluster => "create-cluster",
            Step::CreateInstance => "create-instance",
            Step::UpdatePassword => "update-password",
            Step::LookupCluster => "lookup-cluster",
            Step::CreateSnapshot => "create-snapshot",
            Step::DeleteInstances => "delete-instances",
            Step::DeleteCluster => "delete-cluster",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CoreError {
    /// Strip any `Step` wrappers and return the underlying error
    pub fn root(&self) -> &CoreError {
        match self {
            CoreError::Step { source, .. } => source.root(),
            other => other,
        }
    }

    /// The workflow step this error was raised in, if any
    #[must_use]
    pub fn step(&self) -> Option<Step> {
        match self {
            CoreError::Step { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// The last remote status observed before the failure, if any
    #[must_use]
    pub fn last_status(&self) -> Option<&str> {
        match self.root() {
            CoreError::WaitTimeout { last_status, .. }
            | CoreError::WaitFailed { last_status, .. }
            | CoreError::InstanceCreationFailed { last_status, .. } => last_status.as_deref(),
            _ => None,
        }
    }

    /// Returns true if this is a "not found" error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self.root() {
            CoreError::NotFound { .. } => true,
            CoreError::Provider(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// Returns true if a wait ran out of attempts
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), CoreError::WaitTimeout { .. })
    }

    /// Returns true if the input was rejected before any remote call
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self.root(), CoreError::Validation(_))
    }

    /// Returns true if this error is potentially retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self.root() {
            CoreError::Provider(e) => e.is_transient(),
            CoreError::WaitTimeout { .. } => true,
            _ => false,
        }
    }
}
