use std::fmt::Debug;

use crate::AccessController;
use crate::MutationLog;
use crate::ReplicaHost;
use crate::ReplicationApp;

/// **This coding style learned from OpenRaft project type config.**
///
/// Bundles the pluggable seams of a replica as associated types so the whole
/// stack is wired by a single generic parameter.
pub trait TypeConfig:
    Sync + Send + Sized + Debug + Clone + Copy + Default + Eq + PartialEq + 'static
{
    /// Deterministic key-value engine consuming mutations
    type APP: ReplicationApp;

    /// Private write-ahead log for this partition's mutations
    type LOG: MutationLog;

    /// Request-level permission oracle
    type AC: AccessController;

    /// Process-wide container owning the replicas
    type HOST: ReplicaHost;
}

pub mod alias {
    use super::TypeConfig;

    pub type AOF<T> = <T as TypeConfig>::APP;

    pub type LOF<T> = <T as TypeConfig>::LOG;

    pub type ACOF<T> = <T as TypeConfig>::AC;

    pub type HOF<T> = <T as TypeConfig>::HOST;
}
