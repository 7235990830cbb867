pub mod primary_state;
pub mod potential_secondary_state;
pub mod secondary_state;
pub mod split_state;


pub use potential_secondary_state::PotentialSecondaryState;
pub use primary_state::PrimaryState;
pub use secondary_state::SecondaryState;
pub use split_state::SplitState;

use crate::Mutation;
use crate::PartitionStatus;

/// The replica's role bundle, one variant per lifecycle status.
///
/// The original design kept four always-present state bundles with an
/// "exactly one populated" invariant; the tagged variant makes that hold by
/// construction. Leaving a role drops its bundle, entering one builds it
/// fresh.
pub enum RoleState {
    Primary(PrimaryState),
    Secondary(SecondaryState),
    PotentialSecondary(PotentialSecondaryState),
    Split(SplitState),
    Inactive { transient: bool },
    Error,
}

impl RoleState {
    pub fn status(&self) -> PartitionStatus {
        match self {
            RoleState::Primary(_) => PartitionStatus::Primary,
            RoleState::Secondary(_) => PartitionStatus::Secondary,
            RoleState::PotentialSecondary(_) => PartitionStatus::PotentialSecondary,
            RoleState::Split(_) => PartitionStatus::PartitionSplit,
            RoleState::Inactive { .. } => PartitionStatus::Inactive,
            RoleState::Error => PartitionStatus::Error,
        }
    }

    /// Legal lifecycle transitions. Driven externally by the meta service;
    /// the core only enforces the preconditions.
    pub fn transition_allowed(
        from: PartitionStatus,
        to: PartitionStatus,
    ) -> bool {
        use PartitionStatus::*;
        match (from, to) {
            // Staying in place is a configuration update, not a transition.
            (f, t) if f == t => false,
            // ERROR is terminal: only close() gets the replica out.
            (Error, _) => false,
            // Any fatal local failure may land in ERROR.
            (_, Error) => true,
            // Graceful retirement from any non-error role.
            (_, Inactive) => true,
            (Inactive, Primary | Secondary | PotentialSecondary | PartitionSplit) => true,
            // Learner graduates once learning succeeded.
            (PotentialSecondary, Secondary) => true,
            // Promotion and demotion.
            (Secondary, Primary) => true,
            (Primary, Secondary) => true,
            // Split overlays on a secondary and resolves back into one.
            (Secondary, PartitionSplit) => true,
            (PartitionSplit, Secondary) => true,
            _ => false,
        }
    }

    pub fn is_cleaned(&self) -> bool {
        match self {
            RoleState::Primary(s) => s.is_cleaned(),
            RoleState::Secondary(s) => s.is_cleaned(),
            RoleState::PotentialSecondary(s) => s.is_cleaned(),
            RoleState::Split(s) => s.is_cleaned(),
            RoleState::Inactive { .. } | RoleState::Error => true,
        }
    }

    /// Release whatever the active bundle still holds. Returns the drained
    /// write backlog when leaving primary so the callers can answer those
    /// clients.
    pub fn cleanup(&mut self) -> Vec<Mutation> {
        match self {
            RoleState::Primary(s) => s.cleanup(),
            RoleState::Secondary(s) => {
                s.cleanup();
                Vec::new()
            }
            RoleState::PotentialSecondary(s) => {
                s.cleanup();
                Vec::new()
            }
            RoleState::Split(s) => {
                s.cleanup();
                Vec::new()
            }
            RoleState::Inactive { .. } | RoleState::Error => Vec::new(),
        }
    }

    pub fn as_primary(&self) -> Option<&PrimaryState> {
        match self {
            RoleState::Primary(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_primary_mut(&mut self) -> Option<&mut PrimaryState> {
        match self {
            RoleState::Primary(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_secondary(&self) -> Option<&SecondaryState> {
        match self {
            RoleState::Secondary(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_secondary_mut(&mut self) -> Option<&mut SecondaryState> {
        match self {
            RoleState::Secondary(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_potential_secondary(&self) -> Option<&PotentialSecondaryState> {
        match self {
            RoleState::PotentialSecondary(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_potential_secondary_mut(&mut self) -> Option<&mut PotentialSecondaryState> {
        match self {
            RoleState::PotentialSecondary(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_split(&self) -> Option<&SplitState> {
        match self {
            RoleState::Split(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_split_mut(&mut self) -> Option<&mut SplitState> {
        match self {
            RoleState::Split(s) => Some(s),
            _ => None,
        }
    }
}
