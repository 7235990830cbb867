//! Replica Core Error Hierarchy
//!
//! Defines error types for the per-partition replica state machine,
//! categorized by protocol layer and operational concerns.

use std::path::PathBuf;

use config::ConfigError;

use crate::PartitionStatus;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Infrastructure-level failures (disk, serialization)
    #[error(transparent)]
    System(#[from] StorageError),

    /// Configuration validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Replication protocol violations and request-level rejections
    #[error(transparent)]
    Replication(#[from] ReplicationError),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

/// Request-level and protocol-level verdicts surfaced to clients or peers.
///
/// These are clonable value types so responses can carry them and tests can
/// assert on them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplicationError {
    /// Access controller rejection
    #[error("access denied")]
    AclDeny,

    /// Replica not in a role able to serve this request
    #[error("invalid replica state: {status}")]
    InvalidState { status: PartitionStatus },

    /// Throttled reject
    #[error("replica busy")]
    Busy,

    /// Target decree not present in the prepare window
    #[error("decree {0} not found")]
    ObjectNotFound(i64),

    /// Request falls into the hash range being migrated by a partition split
    #[error("partition is splitting")]
    Splitting,

    /// Write admission on a non-primary replica
    #[error("replica is not primary")]
    NotPrimary,

    /// A mutation prepared under an older ballot than the replica's current
    #[error("stale ballot: request {request} < current {current}")]
    StaleBallot { request: i64, current: i64 },

    /// Non-idempotent write rejected while duplication is enabled
    #[error("operation disabled")]
    OperationDisabled,

    /// Application engine failure while applying a mutation
    #[error("application failure: {0}")]
    AppFailure(String),

    /// Private log failure
    #[error("private log failure: {0}")]
    LogFailure(String),

    /// Illegal lifecycle transition requested by the meta service
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: PartitionStatus,
        to: PartitionStatus,
    },

    /// Replica already closed
    #[error("replica closed")]
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Disk I/O failures during log/app-info operations
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Custom error with the offending path attached
    #[error("Error occurred at path: {path}")]
    PathError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Serialization failures for persisted data
    #[error(transparent)]
    BincodeError(#[from] bincode::Error),

    /// Application engine errors
    #[error("Application engine error: {0}")]
    AppError(String),

    /// Private log subsystem failures
    #[error("Private log failure: {0}")]
    LogStorage(String),
}

impl Error {
    /// The client-facing verdict for this error, if it has one.
    pub fn replication_error(&self) -> Option<&ReplicationError> {
        match self {
            Error::Replication(e) => Some(e),
            _ => None,
        }
    }
}
