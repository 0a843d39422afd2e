//! Configuration management for rdsctl
//!
//! Handles configuration loading from files and environment variables.
//! Configuration is stored in TOML format; command-line flags take
//! precedence over anything set here.

#[cfg(target_os = "macos")]
use directories::BaseDirs;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::{ConfigError, Result};
use crate::poller::{PollingConfig, PollingSettings};

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// AWS shared-config profile used when `--profile` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    /// AWS region used when `--region` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Per-operation polling budgets
    #[serde(default)]
    pub polling: PollingOverrides,
}

/// Polling overrides grouped by operation class
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct PollingOverrides {
    #[serde(default, skip_serializing_if = "PollingOverride::is_empty")]
    pub provisioning: PollingOverride,
    #[serde(default, skip_serializing_if = "PollingOverride::is_empty")]
    pub destructive: PollingOverride,
    #[serde(default, skip_serializing_if = "PollingOverride::is_empty")]
    pub snapshot: PollingOverride,
}

/// Fields left unset keep the built-in preset
#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollingOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_transport_errors: Option<u32>,
}

impl PollingOverride {
    pub fn is_empty(&self) -> bool {
        self.delay_secs.is_none() && self.max_attempts.is_none() && self.max_transport_errors.is_none()
    }

    /// Apply this override on top of `base`
    pub fn apply(&self, operation: &'static str, base: PollingConfig) -> Result<PollingConfig> {
        let mut config = base;
        if let Some(secs) = self.delay_secs {
            if secs == 0 {
                return Err(ConfigError::InvalidPolling {
                    operation,
                    message: "delay_secs must be greater than zero".to_string(),
                });
            }
            config.delay = Duration::from_secs(secs);
        }
        if let Some(attempts) = self.max_attempts {
            if attempts == 0 {
                return Err(ConfigError::InvalidPolling {
                    operation,
                    message: "max_attempts must be at least 1".to_string(),
                });
            }
            config.max_attempts = attempts;
        }
        if let Some(errors) = self.max_transport_errors {
            config.max_transport_errors = errors;
        }
        Ok(config)
    }
}

impl Config {
    /// Resolve polling budgets: built-in presets with file overrides applied
    pub fn polling_settings(&self) -> Result<PollingSettings> {
        let defaults = PollingSettings::default();
        Ok(PollingSettings {
            provisioning: self
                .polling
                .provisioning
                .apply("provisioning", defaults.provisioning)?,
            destructive: self
                .polling
                .destructive
                .apply("destructive", defaults.destructive)?,
            snapshot: self.polling.snapshot.apply("snapshot", defaults.snapshot)?,
        })
    }

    /// Profile to use: explicit flag first, then the configured default
    ///
    /// `None` leaves profile selection to the AWS SDK default chain.
    pub fn resolve_profile(&self, explicit_profile: Option<&str>) -> Option<String> {
        explicit_profile
            .map(str::to_string)
            .or_else(|| self.default_profile.clone())
    }

    /// Region to use: explicit flag first, then the configured region
    pub fn resolve_region(&self, explicit_region: Option<&str>) -> Option<String> {
        explicit_region
            .map(str::to_string)
            .or_else(|| self.region.clone())
    }

    /// Load configuration from the standard location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::LoadError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        let expanded_content = Self::expand_env_vars(&content);

        let config: Config = toml::from_str(&expanded_content)?;

        Ok(config)
    }

    /// Save configuration to the standard location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::SaveError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)?;

        fs::write(config_path, content).map_err(|e| ConfigError::SaveError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }

    /// Get the path to the configuration file
    ///
    /// On macOS, this supports both the standard macOS path and Linux-style ~/.config path:
    /// 1. Check ~/.config/rdsctl/config.toml (Linux-style, preferred for consistency)
    /// 2. Fall back to ~/Library/Application Support/com.rdsctl.rdsctl/config.toml (macOS standard)
    ///
    /// On Linux: ~/.config/rdsctl/config.toml
    /// On Windows: %APPDATA%\rdsctl\rdsctl\config.toml
    pub fn config_path() -> Result<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            if let Some(base_dirs) = BaseDirs::new() {
                let linux_style_path = base_dirs
                    .home_dir()
                    .join(".config")
                    .join("rdsctl")
                    .join("config.toml");

                if linux_style_path.exists()
                    || linux_style_path
                        .parent()
                        .map(|p| p.exists())
                        .unwrap_or(false)
                {
                    return Ok(linux_style_path);
                }
            }
        }

        let proj_dirs =
            ProjectDirs::from("com", "rdsctl", "rdsctl").ok_or(ConfigError::ConfigDirError)?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Expand environment variables in configuration content
    ///
    /// Supports ${VAR} and ${VAR:-default} syntax. Unset variables without a
    /// default are left as written.
    ///
    /// Example:
    /// ```toml
    /// default_profile = "${AWS_PROFILE:-staging}"
    /// region = "${AWS_REGION}"
    /// ```
    fn expand_env_vars(content: &str) -> String {
        let expanded =
            shellexpand::env_with_context_no_errors(content, |var| std::env::var(var).ok());
        expanded.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_config_serialization() {
        let config = Config {
            default_profile: Some("staging".to_string()),
            region: Some("eu-west-1".to_string()),
            polling: PollingOverrides {
                snapshot: PollingOverride {
                    delay_secs: Some(5),
                    max_attempts: None,
                    max_transport_errors: Some(1),
                },
                ..Default::default()
            },
        };

        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(deserialized, config);
        assert!(!serialized.contains("provisioning"));
    }

    #[test]
    fn test_polling_settings_defaults() {
        let settings = Config::default().polling_settings().unwrap();
        assert_eq!(settings, PollingSettings::default());
        assert_eq!(settings.snapshot.delay, Duration::from_secs(10));
        assert_eq!(settings.snapshot.max_attempts, 100);
        assert_eq!(settings.provisioning.delay, Duration::from_secs(30));
        assert_eq!(settings.destructive.max_attempts, 60);
    }

    #[test]
    fn test_polling_settings_overrides() {
        let config: Config = toml::from_str(
            r#"
[polling.provisioning]
delay_secs = 15
max_attempts = 120

[polling.snapshot]
max_transport_errors = 0
"#,
        )
        .unwrap();

        let settings = config.polling_settings().unwrap();
        assert_eq!(settings.provisioning.delay, Duration::from_secs(15));
        assert_eq!(settings.provisioning.max_attempts, 120);
        assert_eq!(settings.snapshot.delay, Duration::from_secs(10));
        assert_eq!(settings.snapshot.max_transport_errors, 0);
        assert_eq!(settings.destructive, PollingConfig::destructive());
    }

    #[test]
    fn test_zero_delay_is_rejected() {
        let config: Config = toml::from_str(
            r#"
[polling.destructive]
delay_secs = 0
"#,
        )
        .unwrap();

        let err = config.polling_settings().unwrap_err();
        assert!(err.to_string().contains("destructive"));
        assert!(err.to_string().contains("delay_secs"));
    }

    #[test]
    fn test_resolve_profile_and_region() {
        let config = Config {
            default_profile: Some("staging".to_string()),
            region: Some("eu-west-1".to_string()),
            ..Default::default()
        };

        assert_eq!(config.resolve_profile(Some("prod")).as_deref(), Some("prod"));
        assert_eq!(config.resolve_profile(None).as_deref(), Some("staging"));
        assert_eq!(config.resolve_region(None).as_deref(), Some("eu-west-1"));
        assert_eq!(
            config.resolve_region(Some("us-east-1")).as_deref(),
            Some("us-east-1")
        );
        assert_eq!(Config::default().resolve_profile(None), None);
    }

    #[test]
    #[serial_test::serial]
    fn test_env_var_expansion() {
        unsafe {
            std::env::set_var("RDSCTL_TEST_PROFILE", "from-env");
        }

        let content = r#"
default_profile = "${RDSCTL_TEST_PROFILE}"
region = "${RDSCTL_TEST_MISSING_REGION:-eu-central-1}"
"#;

        let expanded = Config::expand_env_vars(content);
        assert!(expanded.contains("from-env"));
        assert!(expanded.contains("eu-central-1"));

        unsafe {
            std::env::remove_var("RDSCTL_TEST_PROFILE");
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_unset_var_is_left_as_is() {
        unsafe {
            std::env::remove_var("RDSCTL_TEST_UNSET");
        }

        let expanded = Config::expand_env_vars(r#"region = "${RDSCTL_TEST_UNSET}""#);
        assert_eq!(expanded, r#"region = "${RDSCTL_TEST_UNSET}""#);
    }
}
