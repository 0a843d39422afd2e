//! Cluster command definitions

use clap::Subcommand;

/// Aurora cluster commands
#[derive(Subcommand, Debug)]
pub enum ClusterCommands {
    /// List clusters, one line per cluster
    #[command(after_help = "EXAMPLES:
    # All clusters in the region
    rdsctl cluster list

    # One cluster, without the header line
    rdsctl cluster list --cluster staging-horizon-a --no-header
")]
    List {
        /// Only list this cluster
        #[arg(long)]
        cluster: Option<String>,
        /// Do not print the header line
        #[arg(long)]
        no_header: bool,
    },

    /// Restore a cluster from a snapshot, add an instance and reset its password
    #[command(after_help = "EXAMPLES:
    # Restore into the cluster the snapshot was taken from
    rdsctl cluster restore --snapshot-identifier snap-2021-07-29 \\
        --db-subnet-group-name private --vpc-security-group-id sg-123 \\
        --db-cluster-parameter-group-name default.aurora-postgresql13 \\
        --db-instance-class db.r6g.large

NOTES:
    The master password can be passed through RDSCTL_MASTER_PASSWORD instead
    of the command line. A failed step leaves earlier resources in place.
")]
    Restore {
        /// Cluster to create; defaults to the cluster the snapshot was taken from
        #[arg(long)]
        cluster_identifier: Option<String>,
        /// Subnet group the cluster is placed in
        #[arg(long)]
        db_subnet_group_name: String,
        /// Security group attached to the cluster
        #[arg(long)]
        vpc_security_group_id: String,
        /// Cluster parameter group
        #[arg(long)]
        db_cluster_parameter_group_name: String,
        /// New master password
        #[arg(long, env = "RDSCTL_MASTER_PASSWORD", hide_env_values = true)]
        db_cluster_master_password: String,
        /// Instance class of the cluster's instance
        #[arg(long)]
        db_instance_class: String,
        /// Snapshot to restore from
        ///
        /// Required: there is no safe default, restoring a guessed snapshot
        /// would bring up the wrong data.
        #[arg(long)]
        snapshot_identifier: String,
    },

    /// Snapshot a cluster, then delete its instances and the cluster
    #[command(after_help = "EXAMPLES:
    # Snapshot as staging-horizon-a-<timestamp>, delete, return immediately
    rdsctl cluster delete --cluster-identifier staging-horizon-a

    # Name the snapshot and wait until the cluster is gone
    rdsctl cluster delete --cluster-identifier staging-horizon-a \\
        --snapshot-identifier final-2021-07-29 --wait
")]
    Delete {
        /// Cluster to delete
        #[arg(long)]
        cluster_identifier: String,
        /// Name of the snapshot taken first; defaults to <cluster>-<timestamp>
        #[arg(long)]
        snapshot_identifier: Option<String>,
        /// Wait until the cluster is deleted
        #[arg(long)]
        wait: bool,
    },
}
