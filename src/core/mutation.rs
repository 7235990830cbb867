//! A single atomic write of one partition.
//!
//! A mutation carries an ordered sequence of client update records plus the
//! client request handles to answer once the decree commits. The header is
//! immutable once the mutation is pinned in the prepare list; only the
//! logged flag and the outstanding-ack counters advance, which is why they
//! are atomics on the shared `Arc<Mutation>`.

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicI32;
use std::sync::atomic::Ordering;

use bytes::Bytes;
use uuid::Uuid;

use crate::constants::INVALID_DECREE;
use crate::constants::INVALID_OFFSET;
use crate::utils::time::now_ns;
use crate::Ballot;
use crate::ClientRequest;
use crate::Decree;
use crate::Gpid;
use crate::RpcCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationHeader {
    pub pid: Gpid,
    pub ballot: Ballot,
    pub decree: Decree,
    pub log_offset: i64,
    pub timestamp_us: u64,
}

impl Default for MutationHeader {
    fn default() -> Self {
        Self {
            pid: Gpid::default(),
            ballot: 0,
            decree: INVALID_DECREE,
            log_offset: INVALID_OFFSET,
            timestamp_us: 0,
        }
    }
}

/// One client update inside a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRecord {
    pub code: RpcCode,
    pub payload: Bytes,
    pub start_time_ns: u64,
}

/// Tracing metadata carried through the two-phase commit pipeline.
#[derive(Debug, Clone)]
pub struct TraceCtx {
    pub id: Uuid,
    pub created_ns: u64,
}

impl TraceCtx {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_ns: now_ns(),
        }
    }
}

pub struct Mutation {
    pub header: MutationHeader,
    pub updates: Vec<UpdateRecord>,
    pub client_requests: Vec<ClientRequest>,
    pub tracer: TraceCtx,

    is_logged: AtomicBool,
    left_secondary_ack_count: AtomicI32,
    left_potential_secondary_ack_count: AtomicI32,
}

impl Mutation {
    pub fn new() -> Self {
        Self {
            header: MutationHeader::default(),
            updates: Vec::new(),
            client_requests: Vec::new(),
            tracer: TraceCtx::new(),
            is_logged: AtomicBool::new(false),
            left_secondary_ack_count: AtomicI32::new(0),
            left_potential_secondary_ack_count: AtomicI32::new(0),
        }
    }

    /// `gpid.ballot.decree`, the canonical mutation identity in logs.
    pub fn name(&self) -> String {
        format!(
            "{}.{}.{}",
            self.header.pid, self.header.ballot, self.header.decree
        )
    }

    /// Append one client write. The update record and the request handle to
    /// answer after commit stay index-aligned.
    pub fn add_client_request(
        &mut self,
        request: ClientRequest,
    ) {
        self.updates.push(UpdateRecord {
            code: request.code,
            payload: request.payload.clone(),
            start_time_ns: request.start_time_ns,
        });
        self.client_requests.push(request);
    }

    pub fn is_logged(&self) -> bool {
        self.is_logged.load(Ordering::Acquire)
    }

    pub fn set_logged(&self) {
        self.is_logged.store(true, Ordering::Release);
    }

    /// Initialize the outstanding-ack bookkeeping when the primary fans the
    /// prepare out to its group.
    pub fn set_left_ack_counts(
        &self,
        secondary_count: i32,
        potential_secondary_count: i32,
    ) {
        self.left_secondary_ack_count
            .store(secondary_count, Ordering::Release);
        self.left_potential_secondary_ack_count
            .store(potential_secondary_count, Ordering::Release);
    }

    /// Returns the count remaining after this ack.
    pub fn decrease_left_secondary_ack_count(&self) -> i32 {
        self.left_secondary_ack_count.fetch_sub(1, Ordering::AcqRel) - 1
    }

    /// Returns the count remaining after this ack.
    pub fn decrease_left_potential_secondary_ack_count(&self) -> i32 {
        self.left_potential_secondary_ack_count
            .fetch_sub(1, Ordering::AcqRel)
            - 1
    }

    pub fn left_secondary_ack_count(&self) -> i32 {
        self.left_secondary_ack_count.load(Ordering::Acquire)
    }

    pub fn left_potential_secondary_ack_count(&self) -> i32 {
        self.left_potential_secondary_ack_count.load(Ordering::Acquire)
    }

    /// A mutation commits once it is durable in the private log and every
    /// group member it was fanned out to has acknowledged it.
    pub fn is_ready_for_commit(&self) -> bool {
        self.is_logged()
            && self.left_secondary_ack_count() <= 0
            && self.left_potential_secondary_ack_count() <= 0
    }
}

impl Default for Mutation {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Mutation {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Mutation")
            .field("name", &self.name())
            .field("updates", &self.updates.len())
            .field("client_requests", &self.client_requests.len())
            .field("is_logged", &self.is_logged())
            .finish()
    }
}
