use tracing::debug;

use crate::Gpid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkLoadStatus {
    Inactive,
    Downloading,
    Ingesting,
    Succeeded,
    Failed,
}

/// Lifecycle owner of one replica's bulk-load task.
pub struct BulkLoader {
    gpid: Gpid,
    replica_name: String,
    status: BulkLoadStatus,
    shut: bool,
}

impl BulkLoader {
    pub fn new(
        gpid: Gpid,
        replica_name: String,
    ) -> Self {
        Self {
            gpid,
            replica_name,
            status: BulkLoadStatus::Inactive,
            shut: false,
        }
    }

    pub fn status(&self) -> BulkLoadStatus {
        self.status
    }

    pub fn set_status(
        &mut self,
        status: BulkLoadStatus,
    ) {
        self.status = status;
    }

    pub fn shutdown(&mut self) {
        if !self.shut {
            debug!("{}: bulk loader shutdown", self.replica_name);
            self.shut = true;
            self.status = BulkLoadStatus::Inactive;
        }
    }

    pub fn gpid(&self) -> Gpid {
        self.gpid
    }
}
