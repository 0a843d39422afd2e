//! Configuration file commands

use std::path::Path;

use rdsctl_core::{Config, PollingConfig, PollingSettings};
use serde::Serialize;
use tracing::info;

use crate::cli::ConfigCommands;
use crate::commands::CommandContext;
use crate::connection::ConnectionManager;
use crate::error::{RdsCtlError, Result as CliResult};
use crate::output::print_lines_or;

/// Effective configuration, with polling budgets resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveConfig {
    pub path: String,
    pub exists: bool,
    pub default_profile: Option<String>,
    pub region: Option<String>,
    pub polling: EffectivePolling,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectivePolling {
    pub provisioning: PollingBudget,
    pub destructive: PollingBudget,
    pub snapshot: PollingBudget,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PollingBudget {
    pub delay_secs: u64,
    pub max_attempts: u32,
    pub max_transport_errors: u32,
}

impl From<PollingConfig> for PollingBudget {
    fn from(config: PollingConfig) -> Self {
        Self {
            delay_secs: config.delay.as_secs(),
            max_attempts: config.max_attempts,
            max_transport_errors: config.max_transport_errors,
        }
    }
}

impl From<PollingSettings> for EffectivePolling {
    fn from(settings: PollingSettings) -> Self {
        Self {
            provisioning: settings.provisioning.into(),
            destructive: settings.destructive.into(),
            snapshot: settings.snapshot.into(),
        }
    }
}

pub async fn handle_config_command(
    conn_mgr: &ConnectionManager,
    ctx: &CommandContext,
    cmd: &ConfigCommands,
) -> CliResult<()> {
    let path = conn_mgr.config_file()?;

    match cmd {
        ConfigCommands::Path => {
            let display = path.display().to_string();
            print_lines_or(
                std::slice::from_ref(&display),
                serde_json::json!({ "path": display }),
                ctx.output,
                ctx.query(),
            )?;
        }
        ConfigCommands::Show => {
            let effective = effective_config(&conn_mgr.config, &path)?;
            print_lines_or(&show_lines(&effective), &effective, ctx.output, ctx.query())?;
        }
        ConfigCommands::Init {
            default_profile,
            default_region,
            force,
        } => {
            init_config(&path, default_profile.clone(), default_region.clone(), *force)?;
            let display = path.display().to_string();
            print_lines_or(
                &[format!("Wrote {}", display)],
                serde_json::json!({ "path": display }),
                ctx.output,
                ctx.query(),
            )?;
        }
    }

    Ok(())
}

pub fn effective_config(config: &Config, path: &Path) -> CliResult<EffectiveConfig> {
    Ok(EffectiveConfig {
        path: path.display().to_string(),
        exists: path.exists(),
        default_profile: config.default_profile.clone(),
        region: config.region.clone(),
        polling: config.polling_settings()?.into(),
    })
}

fn show_lines(effective: &EffectiveConfig) -> Vec<String> {
    let budget = |name: &str, b: &PollingBudget| {
        format!(
            "polling.{}: every {}s, up to {} attempts, {} transport errors",
            name, b.delay_secs, b.max_attempts, b.max_transport_errors
        )
    };
    vec![
        format!(
            "config: {}{}",
            effective.path,
            if effective.exists { "" } else { " (not found, using defaults)" }
        ),
        format!(
            "default_profile: {}",
            effective.default_profile.as_deref().unwrap_or("<aws default>")
        ),
        format!(
            "region: {}",
            effective.region.as_deref().unwrap_or("<aws default>")
        ),
        budget("provisioning", &effective.polling.provisioning),
        budget("destructive", &effective.polling.destructive),
        budget("snapshot", &effective.polling.snapshot),
    ]
}

/// Write a starter config file; an existing file is kept unless `force`
pub fn init_config(
    path: &Path,
    default_profile: Option<String>,
    region: Option<String>,
    force: bool,
) -> CliResult<()> {
    if path.exists() && !force {
        return Err(RdsCtlError::InvalidInput {
            message: format!(
                "{} already exists; pass --force to overwrite it",
                path.display()
            ),
        });
    }

    let config = Config {
        default_profile,
        region,
        ..Default::default()
    };
    config.save_to_path(path)?;
    info!(path = %path.display(), "Configuration written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rdsctl").join("config.toml");

        init_config(
            &path,
            Some("staging".to_string()),
            Some("eu-west-1".to_string()),
            false,
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.default_profile.as_deref(), Some("staging"));
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn test_init_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "region = \"us-east-1\"\n").unwrap();

        let err = init_config(&path, None, Some("eu-west-1".to_string()), false).unwrap_err();
        assert!(matches!(err, RdsCtlError::InvalidInput { .. }));

        init_config(&path, None, Some("eu-west-1".to_string()), true).unwrap();
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn test_show_reports_default_budgets() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.toml");

        let effective = effective_config(&Config::default(), &path).unwrap();
        let lines = show_lines(&effective);

        assert!(!effective.exists);
        assert!(lines[0].ends_with("(not found, using defaults)"));
        assert_eq!(
            lines[3],
            "polling.provisioning: every 30s, up to 60 attempts, 3 transport errors"
        );
        assert_eq!(
            lines[5],
            "polling.snapshot: every 10s, up to 100 attempts, 3 transport errors"
        );
    }
}
