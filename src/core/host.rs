//! The process-wide container seam.
//!
//! The host owns a set of replicas, dispatches RPCs into them, and carries
//! everything the replica must not own itself: client response delivery,
//! prepare fan-out to peers, and process-level failure reporting. Wire
//! formats are entirely the host's business.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
#[cfg(test)]
use mockall::automock;

use crate::Ballot;
use crate::ClientRequest;
use crate::Decree;
use crate::Gpid;
use crate::Mutation;
use crate::PartitionStatus;
use crate::ReplicationError;

#[cfg_attr(test, automock)]
pub trait ReplicaHost: Send + Sync + 'static {
    /// Address of this replica server, used in replica display names.
    fn address(&self) -> String;

    /// Deliver a client response. `result` carries the read payload on
    /// success; write acknowledgements carry an empty payload.
    fn respond_client(
        &self,
        gpid: Gpid,
        is_read: bool,
        request: &ClientRequest,
        status: PartitionStatus,
        result: std::result::Result<Bytes, ReplicationError>,
    );

    /// Re-enqueue a throttled request for retry after `delay`.
    fn defer_client_request(
        &self,
        gpid: Gpid,
        is_read: bool,
        request: &ClientRequest,
        delay: Duration,
    );

    /// Fan a prepare out to one group member. `committed_decree` piggybacks
    /// the primary's commit point so the receiver can advance.
    fn send_prepare(
        &self,
        target: &str,
        gpid: Gpid,
        ballot: Ballot,
        committed_decree: Decree,
        mu: Arc<Mutation>,
    );

    /// Acknowledge a prepare back to the primary.
    fn send_prepare_ack(
        &self,
        target: &str,
        gpid: Gpid,
        ballot: Ballot,
        decree: Decree,
        err: Option<ReplicationError>,
    );

    /// A replica hit a fatal local failure and moved to `Error`; the host
    /// relays this to the meta service.
    fn on_replica_error(
        &self,
        gpid: Gpid,
        err: ReplicationError,
    );

    /// The randomized checkpoint interval of a replica elapsed.
    fn trigger_checkpoint(
        &self,
        gpid: Gpid,
    );
}
