//! Capability interface of the application state machine.
use std::collections::HashMap;

use bytes::Bytes;
#[cfg(test)]
use mockall::automock;

use crate::ClientRequest;
use crate::Decree;
use crate::Mutation;
use crate::Result;

/// Hotkey detection control, forwarded to the engine untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectHotkeyRequest {
    pub action: String,
    pub hotkey_kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DetectHotkeyResponse {
    pub err: Option<String>,
    pub hotkey: Option<String>,
}

/// The deterministic key-value engine behind one replica.
///
/// The engine consumes committed mutations in decree order, serves reads,
/// and reports its three decree watermarks:
/// `last_durable <= last_flushed <= last_committed`.
#[cfg_attr(test, automock)]
pub trait ReplicationApp: Send + Sync + 'static {
    /// Apply one committed mutation. The caller guarantees
    /// `last_committed_decree() + 1 == mu.header.decree`.
    fn apply_mutation(
        &self,
        mu: &Mutation,
    ) -> Result<()>;

    /// Serve one read. The returned payload is relayed to the client.
    fn on_request(
        &self,
        request: &ClientRequest,
    ) -> Result<Bytes>;

    /// Largest decree applied to the engine.
    fn last_committed_decree(&self) -> Decree;

    /// Largest decree whose effects are persisted in a checkpoint.
    fn last_durable_decree(&self) -> Decree;

    /// Largest decree present in at least a memtable flush.
    fn last_flushed_decree(&self) -> Decree;

    /// Free-form manual compaction state. The replica parses the canonical
    /// substrings "recent start at" / "recent enqueue at" / "last used";
    /// the engine must keep those stable.
    fn query_compact_state(&self) -> String;

    fn query_data_version(&self) -> u32;

    fn on_detect_hotkey(
        &self,
        request: DetectHotkeyRequest,
    ) -> DetectHotkeyResponse;

    /// Propagate replica environment entries (e.g. the restore marker).
    fn set_envs(
        &self,
        envs: &HashMap<String, String>,
    );

    /// Cancel compactions, checkpoints and other background work.
    /// With `wait` the call returns only after the work has stopped.
    fn cancel_background_work(
        &self,
        wait: bool,
    );

    fn close(
        &self,
        clear_state: bool,
    ) -> Result<()>;
}
