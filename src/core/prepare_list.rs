//! Bounded in-memory window of pending mutations keyed by decree.
//!
//! The window retains mutations past their commit point until capacity
//! pressure evicts them, so a primary can re-send recent decrees to a
//! catching-up learner without touching the private log.
//!
//! Committing does not call back into the replica. `commit` advances the
//! committed point and returns the newly committable mutations in decree
//! order; the replica loops over them and executes each one. This keeps the
//! ownership between the replica and its prepare list one-directional.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::Decree;
use crate::Mutation;
use crate::PartitionStatus;
use crate::ReplicationError;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitType {
    /// Advance while the next decree is present, logged, and fully acked.
    /// Used on the primary as acks arrive.
    CommitAllReady,
    /// Advance to the given decree; every decree on the way must be present
    /// and logged. Used when the window is known to be contiguous, e.g.
    /// replaying an inherited prepare tail.
    CommitToDecree(Decree),
    /// Advance toward the given decree but stop at the first gap or
    /// unlogged entry. Used on secondaries and learners following the
    /// primary's piggybacked commit point.
    CommitToDecreeSoft(Decree),
}

pub struct PrepareList {
    committed_decree: Decree,
    capacity: usize,
    mutations: BTreeMap<Decree, Arc<Mutation>>,
}

impl PrepareList {
    pub fn new(
        start_decree: Decree,
        capacity: usize,
    ) -> Self {
        assert!(capacity > 0, "prepare list capacity must be positive");
        Self {
            committed_decree: start_decree,
            capacity,
            mutations: BTreeMap::new(),
        }
    }

    pub fn last_committed_decree(&self) -> Decree {
        self.committed_decree
    }

    pub fn min_decree(&self) -> Decree {
        self.mutations
            .keys()
            .next()
            .copied()
            .unwrap_or(self.committed_decree)
    }

    pub fn max_decree(&self) -> Decree {
        self.mutations
            .keys()
            .next_back()
            .copied()
            .unwrap_or(self.committed_decree)
    }

    pub fn count(&self) -> usize {
        self.mutations.len()
    }

    /// Pin a mutation into the window.
    ///
    /// On a primary decrees are strictly sequential. Secondaries and
    /// learners may see re-sends of decrees at or below the commit point
    /// (dropped silently) and, for learners, decrees ahead of their
    /// catch-up point.
    pub fn prepare(
        &mut self,
        mu: Arc<Mutation>,
        status: PartitionStatus,
    ) -> Result<()> {
        let d = mu.header.decree;

        if d <= self.committed_decree {
            debug!(
                "mutation {} already committed (committed = {}), dropped",
                mu.name(),
                self.committed_decree
            );
            return Ok(());
        }

        if status == PartitionStatus::Primary {
            assert_eq!(
                d,
                self.max_decree() + 1,
                "primary prepares must be sequential"
            );
        }

        self.evict_committed();
        let uncommitted = self
            .mutations
            .range(self.committed_decree + 1..)
            .count();
        assert!(
            uncommitted < self.capacity,
            "prepare window overflow: {} uncommitted mutations, capacity {}",
            uncommitted,
            self.capacity
        );

        self.mutations.insert(d, mu);
        Ok(())
    }

    pub fn get_mutation_by_decree(
        &self,
        decree: Decree,
    ) -> Option<Arc<Mutation>> {
        self.mutations.get(&decree).cloned()
    }

    /// Advance the committed point and return the newly committable
    /// mutations in decree order.
    pub fn commit(
        &mut self,
        commit_type: CommitType,
    ) -> Vec<Arc<Mutation>> {
        let mut committed = Vec::new();

        match commit_type {
            CommitType::CommitAllReady => loop {
                let next = self.committed_decree + 1;
                match self.mutations.get(&next) {
                    Some(mu) if mu.is_ready_for_commit() => {
                        committed.push(mu.clone());
                        self.committed_decree = next;
                    }
                    _ => break,
                }
            },
            CommitType::CommitToDecree(target) => {
                while self.committed_decree < target {
                    let next = self.committed_decree + 1;
                    let mu = self
                        .mutations
                        .get(&next)
                        .unwrap_or_else(|| {
                            panic!("commit to decree {} but decree {} is missing", target, next)
                        })
                        .clone();
                    assert!(
                        mu.is_logged(),
                        "mutation {} must be logged before commit",
                        mu.name()
                    );
                    committed.push(mu);
                    self.committed_decree = next;
                }
            }
            CommitType::CommitToDecreeSoft(target) => {
                while self.committed_decree < target {
                    let next = self.committed_decree + 1;
                    match self.mutations.get(&next) {
                        Some(mu) if mu.is_logged() => {
                            committed.push(mu.clone());
                            self.committed_decree = next;
                        }
                        _ => break,
                    }
                }
            }
        }

        self.evict_committed();
        committed
    }

    /// Empty the window and reset the committed point. Used when the replica
    /// changes role and the pipeline restarts from the app's state.
    pub fn reset(
        &mut self,
        committed_decree: Decree,
    ) {
        self.mutations.clear();
        self.committed_decree = committed_decree;
    }

    /// Drop every mutation above `decree` and hand them back so their client
    /// requests can be answered.
    pub fn truncate(
        &mut self,
        decree: Decree,
    ) -> Vec<Arc<Mutation>> {
        let dropped = self.mutations.split_off(&(decree + 1));
        dropped.into_values().collect()
    }

    /// Look up a mutation, surfacing a client-facing verdict when absent.
    pub fn expect_mutation(
        &self,
        decree: Decree,
    ) -> std::result::Result<Arc<Mutation>, ReplicationError> {
        self.get_mutation_by_decree(decree)
            .ok_or(ReplicationError::ObjectNotFound(decree))
    }

    // Committed mutations stay resident until the window fills up.
    fn evict_committed(&mut self) {
        while self.mutations.len() >= self.capacity {
            let Some((&oldest, _)) = self.mutations.iter().next() else {
                break;
            };
            if oldest > self.committed_decree {
                break;
            }
            self.mutations.remove(&oldest);
        }
    }
}
