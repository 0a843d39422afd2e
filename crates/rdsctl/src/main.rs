use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::{generate, shells};
use rdsctl_core::Config;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod connection;
mod error;
mod output;

use cli::{ClusterCommands, Commands, ConfigCommands, SnapshotCommands};
use commands::CommandContext;
use connection::ConnectionManager;
use error::RdsCtlError;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Initialize tracing based on verbosity level
    init_tracing(cli.verbose);

    // Load configuration from specified path or default location
    let loaded = match &cli.config_file {
        Some(config_file) => {
            let path = std::path::PathBuf::from(config_file);
            debug!("Loading config from explicit path: {:?}", path);
            Config::load_from_path(&path).map(|config| (config, Some(path)))
        }
        None => {
            debug!("Loading config from default location");
            Config::load().map(|config| (config, None))
        }
    };
    let (config, config_path) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            RdsCtlError::from(e).print_diagnostic();
            std::process::exit(1);
        }
    };
    let conn_mgr = ConnectionManager::with_config_path(config, config_path);

    if let Err(e) = execute_command(&cli, &conn_mgr).await {
        e.print_diagnostic();
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    // Check for RUST_LOG env var first, then fall back to verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "rdsctl=warn,rdsctl_core=warn",
            1 => "rdsctl=info,rdsctl_core=info",
            2 => "rdsctl=debug,rdsctl_core=debug",
            _ => "rdsctl=trace,rdsctl_core=trace,aws_config=debug,aws_sdk_rds=debug",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .init();

    debug!("Tracing initialized with verbosity level: {}", verbose);
}

async fn execute_command(cli: &cli::Cli, conn_mgr: &ConnectionManager) -> Result<(), RdsCtlError> {
    info!("Command: {}", format_command(&cli.command));

    let ctx = CommandContext::from_cli(cli);
    let start = std::time::Instant::now();
    let result = match &cli.command {
        Commands::Version => {
            debug!("Showing version information");
            let output_data = serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "name": env!("CARGO_PKG_NAME"),
            });
            output::print_lines_or(
                &[format!("rdsctl {}", env!("CARGO_PKG_VERSION"))],
                &output_data,
                cli.output,
                cli.query.as_deref(),
            )
            .map_err(RdsCtlError::from)
        }
        Commands::Completions { shell } => {
            debug!("Generating completions for {:?}", shell);
            generate_completions(*shell);
            Ok(())
        }
        Commands::Config(config_cmd) => {
            commands::config::handle_config_command(conn_mgr, &ctx, config_cmd).await
        }
        Commands::Cluster(cluster_cmd) => {
            commands::cluster::handle_cluster_command(conn_mgr, &ctx, cluster_cmd).await
        }
        Commands::Snapshot(snapshot_cmd) => {
            commands::snapshot::handle_snapshot_command(conn_mgr, &ctx, snapshot_cmd).await
        }
    };

    let duration = start.elapsed();
    match &result {
        Ok(_) => info!("Command completed successfully in {:?}", duration),
        Err(e) => error!("Command failed after {:?}: {}", duration, e),
    }

    result
}

/// Generate shell completions
fn generate_completions(shell: cli::Shell) {
    let mut cmd = cli::Cli::command();
    let name = cmd.get_name().to_string();

    match shell {
        cli::Shell::Bash => generate(shells::Bash, &mut cmd, name, &mut std::io::stdout()),
        cli::Shell::Zsh => generate(shells::Zsh, &mut cmd, name, &mut std::io::stdout()),
        cli::Shell::Fish => generate(shells::Fish, &mut cmd, name, &mut std::io::stdout()),
        cli::Shell::PowerShell => {
            generate(shells::PowerShell, &mut cmd, name, &mut std::io::stdout())
        }
        cli::Shell::Elvish => generate(shells::Elvish, &mut cmd, name, &mut std::io::stdout()),
    }
}

/// Format command for human-readable logging (without sensitive data)
fn format_command(command: &Commands) -> String {
    match command {
        Commands::Version => "version".to_string(),
        Commands::Completions { shell } => format!("completions {:?}", shell),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Path => "config path".to_string(),
            ConfigCommands::Show => "config show".to_string(),
            ConfigCommands::Init { force, .. } => format!("config init (force: {})", force),
        },
        Commands::Cluster(cmd) => match cmd {
            ClusterCommands::List { cluster, .. } => match cluster {
                Some(id) => format!("cluster list --cluster {}", id),
                None => "cluster list".to_string(),
            },
            ClusterCommands::Restore {
                cluster_identifier,
                snapshot_identifier,
                ..
            } => format!(
                "cluster restore --snapshot-identifier {} --cluster-identifier {} [password redacted]",
                snapshot_identifier,
                cluster_identifier.as_deref().unwrap_or("<from snapshot>")
            ),
            ClusterCommands::Delete {
                cluster_identifier,
                wait,
                ..
            } => format!(
                "cluster delete --cluster-identifier {} (wait: {})",
                cluster_identifier, wait
            ),
        },
        Commands::Snapshot(cmd) => match cmd {
            SnapshotCommands::List { .. } => "snapshot list".to_string(),
            SnapshotCommands::Create {
                cluster_identifier, ..
            } => format!("snapshot create --cluster-identifier {}", cluster_identifier),
            SnapshotCommands::Copy { source, target, .. } => {
                format!("snapshot copy {} -> {}", source, target)
            }
            SnapshotCommands::Share {
                snapshot_identifier,
                account_id,
            } => format!("snapshot share {} with {}", snapshot_identifier, account_id),
            SnapshotCommands::Delete {
                snapshot_identifier,
                ..
            } => format!("snapshot delete {}", snapshot_identifier),
        },
    }
}
