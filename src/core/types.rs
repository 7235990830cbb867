//! Decree arithmetic and the small value types shared across the replica
//! subsystem.
//!
//! A `Decree` identifies a position in one partition's replicated log; a
//! `Ballot` identifies a primary term. Both increase monotonically and a
//! mutation is valid only within the ballot it was prepared under.

use std::fmt;

use bytes::Bytes;

/// Monotonically increasing log position for one partition.
pub type Decree = i64;

/// Primary term identifier; bumped on each reconfiguration.
pub type Ballot = i64;

/// Group partition id: `(app_id, partition_index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Gpid {
    pub app_id: i32,
    pub partition_index: i32,
}

impl Gpid {
    pub fn new(
        app_id: i32,
        partition_index: i32,
    ) -> Self {
        Self {
            app_id,
            partition_index,
        }
    }
}

impl fmt::Display for Gpid {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}.{}", self.app_id, self.partition_index)
    }
}

/// The replica's lifecycle status. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionStatus {
    Primary,
    Secondary,
    PotentialSecondary,
    PartitionSplit,
    Inactive,
    Error,
}

impl PartitionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionStatus::Primary => "PRIMARY",
            PartitionStatus::Secondary => "SECONDARY",
            PartitionStatus::PotentialSecondary => "POTENTIAL_SECONDARY",
            PartitionStatus::PartitionSplit => "PARTITION_SPLIT",
            PartitionStatus::Inactive => "INACTIVE",
            PartitionStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for PartitionStatus {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of a potential secondary catching up via snapshot + log replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnerStatus {
    LearningWithoutPrepare,
    LearningWithPrepareTransient,
    LearningWithPrepare,
    LearningSucceeded,
    LearningFailed,
}

impl LearnerStatus {
    /// Whether a learner in this status participates in the prepare flow.
    pub fn accepts_prepare(&self) -> bool {
        matches!(
            self,
            LearnerStatus::LearningWithPrepare
                | LearnerStatus::LearningWithPrepareTransient
                | LearnerStatus::LearningSucceeded
        )
    }
}

/// Disk migration progress. Ordered: the close protocol requires
/// `status >= Moved` when the replica is not in a terminal role status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiskMigrationStatus {
    Idle,
    Moving,
    Moved,
    Closed,
}

/// Result of parsing the app's free-form manual compaction state string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualCompactionStatus {
    Idle,
    Queuing,
    Running,
    Finished,
}

impl fmt::Display for ManualCompactionStatus {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            ManualCompactionStatus::Idle => "idle",
            ManualCompactionStatus::Queuing => "queuing",
            ManualCompactionStatus::Running => "running",
            ManualCompactionStatus::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// Storage RPC codes understood by the application engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcCode {
    Get,
    MultiGet,
    Scan,
    Put,
    MultiPut,
    Remove,
    MultiRemove,
    Incr,
    CheckAndSet,
    /// Non-storage control code; has no table-level latency counter.
    Ping,
}

impl RpcCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RpcCode::Get => "RPC_GET",
            RpcCode::MultiGet => "RPC_MULTI_GET",
            RpcCode::Scan => "RPC_SCAN",
            RpcCode::Put => "RPC_PUT",
            RpcCode::MultiPut => "RPC_MULTI_PUT",
            RpcCode::Remove => "RPC_REMOVE",
            RpcCode::MultiRemove => "RPC_MULTI_REMOVE",
            RpcCode::Incr => "RPC_INCR",
            RpcCode::CheckAndSet => "RPC_CHECK_AND_SET",
            RpcCode::Ping => "RPC_PING",
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(
            self,
            RpcCode::Put
                | RpcCode::MultiPut
                | RpcCode::Remove
                | RpcCode::MultiRemove
                | RpcCode::Incr
                | RpcCode::CheckAndSet
        )
    }

    /// Writes whose effect depends on the current value. These cannot be
    /// duplicated safely and are rejected while duplication is enabled.
    pub fn is_non_idempotent_write(&self) -> bool {
        matches!(self, RpcCode::Incr | RpcCode::CheckAndSet)
    }
}

impl fmt::Display for RpcCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The storage RPC request codes that get a table-level latency counter.
pub fn storage_rpc_req_codes() -> &'static [RpcCode] {
    &[
        RpcCode::Get,
        RpcCode::MultiGet,
        RpcCode::Scan,
        RpcCode::Put,
        RpcCode::MultiPut,
        RpcCode::Remove,
        RpcCode::MultiRemove,
        RpcCode::Incr,
        RpcCode::CheckAndSet,
    ]
}

/// A client request as handed to the replica by the host's RPC layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRequest {
    pub code: RpcCode,
    pub payload: Bytes,
    /// Hash of the request key, used for split-range routing checks.
    pub partition_hash: u64,
    /// Backup requests may be served by stale secondaries.
    pub is_backup_request: bool,
    pub start_time_ns: u64,
}

/// Current membership view of the replica group, as decided by the meta
/// service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicaConfiguration {
    pub pid: Gpid,
    pub ballot: Ballot,
    pub primary: Option<String>,
    pub secondaries: Vec<String>,
    pub learners: Vec<String>,
}
