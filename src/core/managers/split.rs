use tracing::debug;

use crate::Gpid;

/// Lifecycle owner of one replica's partition-split coordination.
///
/// While a split is in flight, the half of the hash space migrating to the
/// child partition must not be served from the parent.
pub struct SplitManager {
    gpid: Gpid,
    replica_name: String,
    /// Partition count of the table before the split started.
    old_partition_count: i32,
    child_gpid: Option<Gpid>,
    shut: bool,
}

impl SplitManager {
    pub fn new(
        gpid: Gpid,
        replica_name: String,
        old_partition_count: i32,
    ) -> Self {
        Self {
            gpid,
            replica_name,
            old_partition_count,
            child_gpid: None,
            shut: false,
        }
    }

    pub fn splitting(&self) -> bool {
        self.child_gpid.is_some() && !self.shut
    }

    pub fn start_split(
        &mut self,
        child_gpid: Gpid,
    ) {
        self.child_gpid = Some(child_gpid);
    }

    pub fn finish_split(&mut self) {
        self.child_gpid = None;
    }

    pub fn child_gpid(&self) -> Option<Gpid> {
        self.child_gpid
    }

    /// During a split the partition count doubles. A request whose hash no
    /// longer routes to this partition under the doubled count belongs to
    /// the child and must be rejected until the split resolves.
    pub fn should_reject_request(
        &self,
        partition_hash: u64,
    ) -> bool {
        if !self.splitting() {
            return false;
        }
        let new_count = (self.old_partition_count as u64) * 2;
        partition_hash % new_count != self.gpid.partition_index as u64
    }

    pub fn shutdown(&mut self) {
        if !self.shut {
            debug!("{}: split manager shutdown", self.replica_name);
            self.shut = true;
            self.child_gpid = None;
        }
    }

    pub fn gpid(&self) -> Gpid {
        self.gpid
    }
}
