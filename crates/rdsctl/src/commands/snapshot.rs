//! Snapshot command handlers

use std::sync::Arc;

use chrono::Utc;
use rdsctl_core::{
    PollingSettings, RdsApi, SnapshotInfo, SnapshotWaiter, default_snapshot_identifier,
    list_snapshots,
};
use serde::Serialize;

use crate::cli::SnapshotCommands;
use crate::commands::CommandContext;
use crate::commands::progress::Spinner;
use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;
use crate::output::{format_create_time, print_lines_or};

/// Result of a snapshot deletion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotDeletion {
    pub snapshot_identifier: String,
    /// `true` only when the snapshot was observed to be gone
    pub deleted: bool,
}

/// Result of sharing a snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotShare {
    pub snapshot_identifier: String,
    pub account_id: String,
}

pub async fn handle_snapshot_command(
    conn_mgr: &ConnectionManager,
    ctx: &CommandContext,
    cmd: &SnapshotCommands,
) -> CliResult<()> {
    let api = conn_mgr
        .create_rds_client(ctx.profile.as_deref(), ctx.region.as_deref())
        .await?;
    let polling = conn_mgr.config.polling_settings()?;

    match cmd {
        SnapshotCommands::List { cluster } => {
            let snapshots = list_snapshots(api.as_ref(), cluster.as_deref()).await?;
            let lines = format_snapshot_rows(&snapshots);
            print_lines_or(&lines, &snapshots, ctx.output, ctx.query())?;
        }
        SnapshotCommands::Create {
            cluster_identifier,
            snapshot_identifier,
        } => {
            let spinner = Spinner::new(
                ctx.output,
                &format!("Snapshotting cluster {}", cluster_identifier),
            );
            let result = create(
                api,
                &polling,
                cluster_identifier,
                snapshot_identifier.as_deref(),
                &spinner,
            )
            .await;
            spinner.finish();

            let snapshot = result?;
            let lines = vec![format!(
                "Created snapshot {} of cluster {}",
                snapshot.identifier, snapshot.cluster_identifier
            )];
            print_lines_or(&lines, &snapshot, ctx.output, ctx.query())?;
        }
        SnapshotCommands::Copy {
            source,
            target,
            kms_key_id,
            wait,
        } => {
            let spinner = Spinner::new(ctx.output, &format!("Copying snapshot {}", source));
            let result = SnapshotWaiter::new(api, target, polling.snapshot)
                .with_progress(Some(spinner.callback()))
                .copy_snapshot_and_wait(source, kms_key_id.as_deref(), *wait)
                .await;
            spinner.finish();

            let snapshot = result?;
            let lines = vec![format!(
                "Copied snapshot {} to {} ({})",
                source, snapshot.identifier, snapshot.status
            )];
            print_lines_or(&lines, &snapshot, ctx.output, ctx.query())?;
        }
        SnapshotCommands::Share {
            snapshot_identifier,
            account_id,
        } => {
            SnapshotWaiter::new(api, snapshot_identifier, polling.snapshot)
                .share_snapshot(account_id)
                .await?;

            let share = SnapshotShare {
                snapshot_identifier: snapshot_identifier.clone(),
                account_id: account_id.clone(),
            };
            let lines = vec![format!(
                "Shared snapshot {} with account {}",
                snapshot_identifier, account_id
            )];
            print_lines_or(&lines, &share, ctx.output, ctx.query())?;
        }
        SnapshotCommands::Delete {
            snapshot_identifier,
            wait,
        } => {
            let spinner = Spinner::new(
                ctx.output,
                &format!("Deleting snapshot {}", snapshot_identifier),
            );
            let result = SnapshotWaiter::new(api, snapshot_identifier, polling.destructive)
                .with_progress(Some(spinner.callback()))
                .delete_snapshot(*wait)
                .await;
            spinner.finish();

            let deletion = SnapshotDeletion {
                snapshot_identifier: snapshot_identifier.clone(),
                deleted: result?,
            };
            let lines = vec![if deletion.deleted {
                format!("Deleted snapshot {}", snapshot_identifier)
            } else {
                format!("Requested deletion of snapshot {}", snapshot_identifier)
            }];
            print_lines_or(&lines, &deletion, ctx.output, ctx.query())?;
        }
    }

    Ok(())
}

/// Snapshot `cluster_identifier`, naming it `<cluster>-<timestamp>` by default
pub async fn create(
    api: Arc<dyn RdsApi>,
    polling: &PollingSettings,
    cluster_identifier: &str,
    snapshot_identifier: Option<&str>,
    spinner: &Spinner,
) -> CliResult<SnapshotInfo> {
    let snapshot_identifier = snapshot_identifier
        .map(str::to_string)
        .unwrap_or_else(|| default_snapshot_identifier(cluster_identifier, Utc::now()));
    let snapshot = SnapshotWaiter::new(api, snapshot_identifier, polling.snapshot)
        .with_progress(Some(spinner.callback()))
        .create_snapshot_and_wait(cluster_identifier)
        .await?;
    Ok(snapshot)
}

/// Lines of the plain `snapshot list` output
pub fn format_snapshot_rows(snapshots: &[SnapshotInfo]) -> Vec<String> {
    let mut lines = Vec::with_capacity(snapshots.len() + 1);
    if !snapshots.is_empty() {
        lines.push(
            "DBClusterSnapshotIdentifier, DBClusterIdentifier, Status, SnapshotCreateTime"
                .to_string(),
        );
    }
    lines.extend(snapshots.iter().map(|s| {
        format!(
            "{}, {}, {}, {}",
            s.identifier,
            s.cluster_identifier,
            s.status,
            format_create_time(s.create_time)
        )
    }));
    lines
}
