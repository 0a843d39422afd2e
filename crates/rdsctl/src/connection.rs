//! Connection management for the RDS client

use std::path::PathBuf;
use std::sync::Arc;

use rdsctl_core::{Config, ProgressCallback, RdsApi, RdsClient, WorkflowOptions};
use tracing::{debug, info};

use crate::error::Result as CliResult;

/// Resolves profile, region and polling budgets from flags and config
#[derive(Clone)]
pub struct ConnectionManager {
    pub config: Config,
    pub config_path: Option<PathBuf>,
}

impl ConnectionManager {
    /// Create a new connection manager with a custom config path
    pub fn with_config_path(config: Config, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
        }
    }

    /// The config file in effect: the explicit one, or the platform default
    pub fn config_file(&self) -> CliResult<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::config_path()?),
        }
    }

    /// Create an RDS client
    ///
    /// Explicit flags win over the config file; anything still unset is left
    /// to the AWS SDK default chain (environment, shared config, IMDS).
    pub async fn create_rds_client(
        &self,
        profile: Option<&str>,
        region: Option<&str>,
    ) -> CliResult<Arc<dyn RdsApi>> {
        let profile = self.config.resolve_profile(profile);
        let region = self.config.resolve_region(region);

        match (&profile, &region) {
            (None, None) => debug!("Using the AWS SDK default profile and region"),
            _ => info!(
                profile = profile.as_deref().unwrap_or("<default>"),
                region = region.as_deref().unwrap_or("<default>"),
                "Creating RDS client"
            ),
        }

        let client = RdsClient::connect(profile.as_deref(), region.as_deref()).await;
        Ok(Arc::new(client))
    }

    /// Workflow options with the configured polling budgets
    pub fn workflow_options(&self, on_progress: Option<ProgressCallback>) -> CliResult<WorkflowOptions> {
        Ok(WorkflowOptions {
            polling: self.config.polling_settings()?,
            on_progress,
        })
    }
}
