//! Command implementations
//!
//! Handlers take an `Arc<dyn RdsApi>` so they run unchanged against the
//! AWS client or an in-memory fake.

pub mod cluster;
pub mod config;
pub mod progress;
pub mod snapshot;

use crate::cli::{Cli, OutputFormat};

/// Flags every command sees
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub profile: Option<String>,
    pub region: Option<String>,
    pub output: OutputFormat,
    pub query: Option<String>,
}

impl CommandContext {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            profile: cli.profile.clone(),
            region: cli.region.clone(),
            output: cli.output,
            query: cli.query.clone(),
        }
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }
}
