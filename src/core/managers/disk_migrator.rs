use tracing::debug;
use tracing::info;

use crate::DiskMigrationStatus;
use crate::Gpid;

/// Lifecycle owner of one replica's disk-to-disk migration.
///
/// A replica whose data finished moving (`Moved`) may be closed without
/// first going inactive; the close path then flips the directory over and
/// the migrator reaches `Closed`.
pub struct DiskMigrator {
    gpid: Gpid,
    replica_name: String,
    status: DiskMigrationStatus,
    origin_dir: String,
    target_dir: Option<String>,
}

impl DiskMigrator {
    pub fn new(
        gpid: Gpid,
        replica_name: String,
        origin_dir: String,
    ) -> Self {
        Self {
            gpid,
            replica_name,
            status: DiskMigrationStatus::Idle,
            origin_dir,
            target_dir: None,
        }
    }

    pub fn status(&self) -> DiskMigrationStatus {
        self.status
    }

    pub fn start_migration(
        &mut self,
        target_dir: String,
    ) {
        self.target_dir = Some(target_dir);
        self.status = DiskMigrationStatus::Moving;
    }

    pub fn mark_moved(&mut self) {
        assert_eq!(self.status, DiskMigrationStatus::Moving);
        self.status = DiskMigrationStatus::Moved;
    }

    /// Flip the replica directory to the migration target.
    /// `Moved -> Closed`; called from the close path.
    pub fn update_replica_dir(&mut self) -> String {
        assert_eq!(
            self.status,
            DiskMigrationStatus::Moved,
            "replica dir can only be updated after data has moved"
        );
        let new_dir = self
            .target_dir
            .clone()
            .unwrap_or_else(|| self.origin_dir.clone());
        info!(
            "{}: replica dir updated to {} after disk migration",
            self.replica_name, new_dir
        );
        self.status = DiskMigrationStatus::Closed;
        new_dir
    }

    pub fn shutdown(&mut self) {
        debug!("{}: disk migrator shutdown", self.replica_name);
    }

    pub fn gpid(&self) -> Gpid {
        self.gpid
    }
}
