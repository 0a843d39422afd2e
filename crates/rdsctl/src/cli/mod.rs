//! CLI structure and command definitions
//!
//! Defines the command-line interface using clap:
//! 1. Cluster lifecycle (`cluster list|restore|delete`)
//! 2. Snapshot housekeeping (`snapshot list|create|copy|share|delete`)
//! 3. Local tooling (`config`, `completions`, `version`)

use clap::{Parser, Subcommand};

pub mod cluster;
pub mod snapshot;

pub use cluster::*;
pub use snapshot::*;

/// AWS RDS Aurora cluster lifecycle CLI
#[derive(Parser, Debug)]
#[command(name = "rdsctl")]
#[command(version, about = "Restore, snapshot and destroy AWS RDS Aurora clusters")]
#[command(long_about = "
Restore, snapshot and destroy AWS RDS Aurora clusters

Every long-running step blocks until RDS reports the resource ready:
restoring a cluster waits for the cluster, then its instance, then the
master password change.

EXAMPLES:
    # List clusters in the default profile and region
    rdsctl cluster list

    # Restore a cluster from a snapshot
    rdsctl cluster restore --snapshot-identifier snap-2021-07-29 \\
        --db-subnet-group-name private --vpc-security-group-id sg-123 \\
        --db-cluster-parameter-group-name default.aurora-postgresql13 \\
        --db-instance-class db.r6g.large

    # Snapshot a cluster, then delete it and wait until it is gone
    rdsctl cluster delete --cluster-identifier staging-horizon-a --wait

    # Filter output with JMESPath
    rdsctl cluster list -o json -q '[?status==`available`].identifier'

For more help on a specific command, run:
    rdsctl <command> --help
")]
pub struct Cli {
    /// AWS shared-config profile to use; falls back to default_profile, then AWS_PROFILE
    #[arg(long, short, global = true)]
    pub profile: Option<String>,

    /// AWS region to use
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Path to alternate configuration file
    #[arg(long, global = true, env = "RDSCTL_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value = "auto")]
    pub output: OutputFormat,

    /// JMESPath query to filter output
    #[arg(long, short = 'q', global = true)]
    pub query: Option<String>,

    /// Enable verbose logging
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain text, one line per resource
    Auto,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Human-readable table format
    Table,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Aurora cluster operations
    #[command(subcommand)]
    Cluster(ClusterCommands),

    /// Cluster snapshot operations
    #[command(subcommand)]
    Snapshot(SnapshotCommands),

    /// Inspect or create the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    #[command(visible_alias = "ver")]
    Version,
}

/// Configuration file commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the configuration file location
    Path,
    /// Print the effective configuration, including polling budgets
    Show,
    /// Write a configuration file with the given defaults
    Init {
        /// Default AWS profile
        #[arg(long = "default-profile")]
        default_profile: Option<String>,
        /// Default AWS region
        #[arg(long = "default-region")]
        default_region: Option<String>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Supported shells for completions
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
    Elvish,
}
