use tracing::debug;

use crate::Decree;
use crate::Gpid;

/// Lifecycle owner of the cross-cluster duplication pipeline for one
/// replica.
///
/// Duplication ships confirmed mutations to a remote cluster; the core only
/// needs to know whether duplication is enabled (non-idempotent writes are
/// rejected while it is) and how far the remote side has confirmed.
pub struct DuplicationManager {
    gpid: Gpid,
    replica_name: String,
    duplicating: bool,
    min_confirmed_decree: Option<Decree>,
    pending_mutation_count: usize,
    shut: bool,
}

impl DuplicationManager {
    pub fn new(
        gpid: Gpid,
        replica_name: String,
        duplicating: bool,
    ) -> Self {
        Self {
            gpid,
            replica_name,
            duplicating,
            min_confirmed_decree: None,
            pending_mutation_count: 0,
            shut: false,
        }
    }

    pub fn duplicating(&self) -> bool {
        self.duplicating && !self.shut
    }

    pub fn set_duplicating(
        &mut self,
        duplicating: bool,
    ) {
        self.duplicating = duplicating;
    }

    /// Smallest decree every duplication target has confirmed, if any
    /// duplication has run.
    pub fn min_confirmed_decree(&self) -> Option<Decree> {
        self.min_confirmed_decree
    }

    pub fn update_confirmed_decree(
        &mut self,
        decree: Decree,
    ) {
        self.min_confirmed_decree = Some(decree);
    }

    pub fn pending_mutation_count(&self) -> usize {
        self.pending_mutation_count
    }

    /// Duplication may still have tasks referencing the replica; it is
    /// always the first manager torn down.
    pub fn shutdown(&mut self) {
        if !self.shut {
            debug!("{}: duplication manager shutdown", self.replica_name);
            self.shut = true;
            self.pending_mutation_count = 0;
        }
    }

    pub fn gpid(&self) -> Gpid {
        self.gpid
    }
}
