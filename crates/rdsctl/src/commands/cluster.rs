//! Cluster command handlers

use std::sync::Arc;

use rdsctl_core::{
    ClusterInfo, DestroyReport, DestroyRequest, RdsApi, RestoreReport, RestoreRequest,
    WorkflowOptions, destroy_cluster, list_clusters, restore_cluster,
};
use tracing::debug;

use crate::cli::ClusterCommands;
use crate::commands::CommandContext;
use crate::commands::progress::Spinner;
use crate::connection::ConnectionManager;
use crate::error::{RdsCtlError, Result as CliResult};
use crate::output::{format_cluster_rows, print_lines_or};

pub async fn handle_cluster_command(
    conn_mgr: &ConnectionManager,
    ctx: &CommandContext,
    cmd: &ClusterCommands,
) -> CliResult<()> {
    let api = conn_mgr
        .create_rds_client(ctx.profile.as_deref(), ctx.region.as_deref())
        .await?;

    match cmd {
        ClusterCommands::List { cluster, no_header } => {
            let clusters = list(api.as_ref(), cluster.as_deref()).await?;
            let lines = format_cluster_rows(&clusters, *no_header);
            print_lines_or(&lines, &clusters, ctx.output, ctx.query())?;
        }
        ClusterCommands::Restore {
            cluster_identifier,
            db_subnet_group_name,
            vpc_security_group_id,
            db_cluster_parameter_group_name,
            db_cluster_master_password,
            db_instance_class,
            snapshot_identifier,
        } => {
            let request = RestoreRequest {
                cluster_identifier: cluster_identifier.clone(),
                snapshot_identifier: snapshot_identifier.clone(),
                db_subnet_group_name: db_subnet_group_name.clone(),
                vpc_security_group_id: vpc_security_group_id.clone(),
                db_cluster_parameter_group_name: db_cluster_parameter_group_name.clone(),
                master_password: db_cluster_master_password.clone(),
                db_instance_class: db_instance_class.clone(),
            };
            debug!(?request, "Restore requested");

            let spinner = Spinner::new(
                ctx.output,
                &format!("Restoring from snapshot {}", snapshot_identifier),
            );
            let options = conn_mgr.workflow_options(Some(spinner.callback()))?;
            let result = restore(api, &request, &options).await;
            spinner.finish();

            let report = result?;
            print_lines_or(&restore_summary(&report), &report, ctx.output, ctx.query())?;
        }
        ClusterCommands::Delete {
            cluster_identifier,
            snapshot_identifier,
            wait,
        } => {
            let request = DestroyRequest {
                cluster_identifier: cluster_identifier.clone(),
                snapshot_identifier: snapshot_identifier.clone(),
                wait: *wait,
            };

            let spinner = Spinner::new(
                ctx.output,
                &format!("Destroying cluster {}", cluster_identifier),
            );
            let options = conn_mgr.workflow_options(Some(spinner.callback()))?;
            let result = destroy(api, &request, &options).await;
            spinner.finish();

            let report = result?;
            print_lines_or(&destroy_summary(&report), &report, ctx.output, ctx.query())?;
        }
    }

    Ok(())
}

pub async fn list(api: &dyn RdsApi, cluster: Option<&str>) -> CliResult<Vec<ClusterInfo>> {
    Ok(list_clusters(api, cluster).await?)
}

pub async fn restore(
    api: Arc<dyn RdsApi>,
    request: &RestoreRequest,
    options: &WorkflowOptions,
) -> CliResult<RestoreReport> {
    restore_cluster(api, request, options)
        .await
        .map_err(|e| RdsCtlError::from_core(e, request.cluster_identifier.as_deref()))
}

pub async fn destroy(
    api: Arc<dyn RdsApi>,
    request: &DestroyRequest,
    options: &WorkflowOptions,
) -> CliResult<DestroyReport> {
    destroy_cluster(api, request, options)
        .await
        .map_err(|e| RdsCtlError::from_core(e, Some(&request.cluster_identifier)))
}

fn restore_summary(report: &RestoreReport) -> Vec<String> {
    vec![format!(
        "Restored cluster {} ({}) from snapshot {} with instance {} ({})",
        report.cluster.identifier,
        report.cluster.status,
        report.snapshot_identifier,
        report.instance.identifier,
        report.instance.instance_class.as_deref().unwrap_or("unknown class"),
    )]
}

fn destroy_summary(report: &DestroyReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Created snapshot {} of cluster {}",
        report.snapshot.identifier, report.cluster_identifier
    )];
    if !report.deleted_instances.is_empty() {
        lines.push(format!(
            "Requested deletion of instances: {}",
            report.deleted_instances.join(", ")
        ));
    }
    lines.push(if report.cluster_deleted {
        format!("Deleted cluster {}", report.cluster_identifier)
    } else {
        format!("Requested deletion of cluster {}", report.cluster_identifier)
    });
    lines
}
