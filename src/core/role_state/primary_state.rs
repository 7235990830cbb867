use crate::Decree;
use crate::Mutation;
use crate::ReplicaConfiguration;
use crate::WriteQueue;

/// State a replica carries only while serving as primary.
pub struct PrimaryState {
    /// Membership view of the replica group under the current ballot.
    pub membership: ReplicaConfiguration,

    /// Highest decree found prepared when this replica was promoted. A new
    /// primary must re-commit its inherited prepared window before serving
    /// non-backup reads.
    pub last_prepare_decree_on_new_primary: Decree,

    /// Client writes awaiting admission into the prepare pipeline.
    pub write_queue: WriteQueue,

    /// A group-check round has been scheduled but not completed.
    pub group_check_pending: bool,
}

impl PrimaryState {
    pub fn new(
        membership: ReplicaConfiguration,
        last_prepare_decree_on_new_primary: Decree,
        staleness_for_commit: i64,
        batch_write_disabled: bool,
    ) -> Self {
        Self {
            membership,
            last_prepare_decree_on_new_primary,
            write_queue: WriteQueue::new(staleness_for_commit, batch_write_disabled),
            group_check_pending: false,
        }
    }

    /// Remote peers the prepare fan-out targets: all secondaries, plus
    /// learners whose learning status accepts prepares (decided by the
    /// caller, which owns the learner bookkeeping).
    pub fn secondary_count(&self) -> i32 {
        self.membership.secondaries.len() as i32
    }

    pub fn is_cleaned(&self) -> bool {
        self.write_queue.is_empty() && !self.group_check_pending
    }

    /// Drop primary-only state; the drained backlog is handed back so the
    /// replica can answer those clients.
    pub fn cleanup(&mut self) -> Vec<Mutation> {
        self.group_check_pending = false;
        self.write_queue.drain()
    }
}
