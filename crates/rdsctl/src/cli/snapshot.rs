//! Snapshot command definitions

use clap::Subcommand;

/// Cluster snapshot commands
#[derive(Subcommand, Debug)]
pub enum SnapshotCommands {
    /// List cluster snapshots
    List {
        /// Only snapshots taken from this cluster
        #[arg(long)]
        cluster: Option<String>,
    },

    /// Snapshot a cluster and wait until the snapshot is available
    Create {
        /// Cluster to snapshot
        #[arg(long)]
        cluster_identifier: String,
        /// Name of the new snapshot; defaults to <cluster>-<timestamp>
        #[arg(long)]
        snapshot_identifier: Option<String>,
    },

    /// Copy a snapshot, optionally re-encrypting it
    Copy {
        /// Snapshot to copy
        #[arg(long)]
        source: String,
        /// Name of the copy
        #[arg(long)]
        target: String,
        /// KMS key to encrypt the copy with
        #[arg(long)]
        kms_key_id: Option<String>,
        /// Wait until the copy is available
        #[arg(long)]
        wait: bool,
    },

    /// Allow another AWS account to restore from a snapshot
    Share {
        /// Snapshot to share
        #[arg(long)]
        snapshot_identifier: String,
        /// AWS account ID to share with
        #[arg(long)]
        account_id: String,
    },

    /// Delete a snapshot
    Delete {
        /// Snapshot to delete
        #[arg(long)]
        snapshot_identifier: String,
        /// Wait until the snapshot is gone
        #[arg(long)]
        wait: bool,
    },
}
