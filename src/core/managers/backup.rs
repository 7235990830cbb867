use tracing::debug;

use crate::Gpid;

/// Lifecycle owner of cold backup bookkeeping for one replica.
pub struct BackupManager {
    gpid: Gpid,
    replica_name: String,
    /// Number of cold backup contexts currently running.
    pub running_count: i32,
    /// Longest observed cold backup duration.
    pub max_duration_ms: u64,
    /// Largest file uploaded by any cold backup so far.
    pub max_upload_file_size: u64,
    shut: bool,
}

impl BackupManager {
    pub fn new(
        gpid: Gpid,
        replica_name: String,
    ) -> Self {
        Self {
            gpid,
            replica_name,
            running_count: 0,
            max_duration_ms: 0,
            max_upload_file_size: 0,
            shut: false,
        }
    }

    pub fn record_backup(
        &mut self,
        duration_ms: u64,
        upload_file_size: u64,
    ) {
        self.max_duration_ms = self.max_duration_ms.max(duration_ms);
        self.max_upload_file_size = self.max_upload_file_size.max(upload_file_size);
    }

    pub fn shutdown(&mut self) {
        if !self.shut {
            debug!("{}: backup manager shutdown", self.replica_name);
            self.shut = true;
            self.running_count = 0;
        }
    }

    pub fn gpid(&self) -> Gpid {
        self.gpid
    }
}
