use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Mutation pipeline and checkpoint parameters of one replica host process.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReplicationConfig {
    /// Upper bound on `max_prepared_decree - last_committed_decree`: how far
    /// the prepare pipeline may run ahead of the commit point.
    #[serde(default = "default_staleness_for_commit")]
    pub staleness_for_commit: i64,

    /// When true, each client write gets its own mutation; batching of
    /// consecutive writes into one mutation is disabled.
    #[serde(default)]
    pub batch_write_disabled: bool,

    /// Capacity of the in-memory prepare window, in mutations.
    #[serde(default = "default_max_mutation_count")]
    pub max_mutation_count_in_prepare_list: usize,

    /// Upper bound of the checkpoint interval. The actual trigger point is
    /// randomized within `[max/2, max]` of this bound.
    #[serde(default = "default_checkpoint_max_interval_hours")]
    pub checkpoint_max_interval_hours: u64,

    /// Log each committed mutation at info level.
    #[serde(default)]
    pub verbose_commit_log: bool,

    /// How long a primary waits for group prepare acks before flagging the
    /// mutation to the meta service.
    #[serde(default = "default_prepare_ack_timeout_ms")]
    pub prepare_ack_timeout_ms: u64,
}

impl ReplicationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.staleness_for_commit < 1 {
            return Err(Error::Fatal(
                "staleness_for_commit must be at least 1".into(),
            ));
        }

        if self.max_mutation_count_in_prepare_list < 2 * self.staleness_for_commit as usize {
            return Err(Error::Fatal(format!(
                "max_mutation_count_in_prepare_list {} must be at least twice staleness_for_commit {}",
                self.max_mutation_count_in_prepare_list, self.staleness_for_commit
            )));
        }

        if self.checkpoint_max_interval_hours == 0 {
            return Err(Error::Fatal(
                "checkpoint_max_interval_hours must be greater than 0".into(),
            ));
        }

        if self.prepare_ack_timeout_ms == 0 {
            return Err(Error::Fatal(
                "prepare_ack_timeout_ms must be at least 1ms".into(),
            ));
        }

        Ok(())
    }
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            staleness_for_commit: default_staleness_for_commit(),
            batch_write_disabled: false,
            max_mutation_count_in_prepare_list: default_max_mutation_count(),
            checkpoint_max_interval_hours: default_checkpoint_max_interval_hours(),
            verbose_commit_log: false,
            prepare_ack_timeout_ms: default_prepare_ack_timeout_ms(),
        }
    }
}

fn default_staleness_for_commit() -> i64 {
    10
}
fn default_max_mutation_count() -> usize {
    2500
}
fn default_checkpoint_max_interval_hours() -> u64 {
    2
}
// in ms
fn default_prepare_ack_timeout_ms() -> u64 {
    3000
}
