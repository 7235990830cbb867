//! Ordered backlog of client writes awaiting primary admission.
//!
//! Admission is gated by the prepare window: `check_possible_work` hands out
//! the next pending mutation only while the number of prepared-but-uncommitted
//! decrees stays below the configured staleness bound.

use std::collections::VecDeque;

use crate::ClientRequest;
use crate::Mutation;

pub struct WriteQueue {
    /// Staleness bound: maximum prepared-but-uncommitted decrees in flight.
    max_concurrent: i64,
    batch_disabled: bool,
    queue: VecDeque<Mutation>,
}

impl WriteQueue {
    pub fn new(
        max_concurrent: i64,
        batch_disabled: bool,
    ) -> Self {
        Self {
            max_concurrent,
            batch_disabled,
            queue: VecDeque::new(),
        }
    }

    /// Queue one client write. Unless batching is disabled, consecutive
    /// writes waiting for admission share one mutation.
    pub fn enqueue(
        &mut self,
        request: ClientRequest,
    ) {
        if !self.batch_disabled {
            if let Some(pending) = self.queue.back_mut() {
                pending.add_client_request(request);
                return;
            }
        }

        let mut mu = Mutation::new();
        mu.add_client_request(request);
        self.queue.push_back(mu);
    }

    /// Pull the next queued write if the prepare window has room.
    ///
    /// `current_running_count` is the number of mutations prepared but not
    /// yet committed.
    pub fn check_possible_work(
        &mut self,
        current_running_count: i64,
    ) -> Option<Mutation> {
        if current_running_count >= self.max_concurrent {
            return None;
        }
        self.queue.pop_front()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Hand back everything still queued so the clients can be answered on
    /// role exit.
    pub fn drain(&mut self) -> Vec<Mutation> {
        self.queue.drain(..).collect()
    }
}
