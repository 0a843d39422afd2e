//! Configuration for rdsctl
//!
// Allow nested config module - this is intentional for the config subsystem

#![allow(clippy::module_inception)]
//!
//! A single TOML file holds the default AWS profile and region plus
//! per-operation polling budgets.
//!
//! # Features
//!
//! - Environment variable expansion in config files
//! - Platform-specific config file locations
//! - Polling overrides for provisioning, destructive and snapshot waits

pub mod config;
pub mod error;

pub use config::{Config, PollingOverride, PollingOverrides};
pub use error::{ConfigError, Result};
