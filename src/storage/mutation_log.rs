//! Capability interface of the per-partition write-ahead log.
#[cfg(test)]
use mockall::automock;

use crate::Mutation;
use crate::Result;

/// Private write-ahead log for one partition's mutations.
///
/// The disk layout is the log implementation's business; the core only
/// appends, reads the size for its gauge, and closes.
#[cfg_attr(test, automock)]
pub trait MutationLog: Send + Sync + 'static {
    /// Append one mutation and return its log offset.
    fn append(
        &self,
        mu: &Mutation,
    ) -> Result<i64>;

    fn total_size(&self) -> u64;

    fn close(&self);
}
