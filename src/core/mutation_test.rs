use bytes::Bytes;

use crate::utils::time::now_ns;
use crate::ClientRequest;
use crate::Gpid;
use crate::Mutation;
use crate::RpcCode;

fn write_request(code: RpcCode) -> ClientRequest {
    ClientRequest {
        code,
        payload: Bytes::from_static(b"k=v"),
        partition_hash: 0,
        is_backup_request: false,
        start_time_ns: now_ns(),
    }
}

#[test]
fn test_name_renders_identity() {
    let mut mu = Mutation::new();
    mu.header.pid = Gpid::new(2, 7);
    mu.header.ballot = 3;
    mu.header.decree = 41;
    assert_eq!(mu.name(), "2.7.3.41");
}

#[test]
fn test_add_client_request_keeps_updates_aligned() {
    let mut mu = Mutation::new();
    mu.add_client_request(write_request(RpcCode::Put));
    mu.add_client_request(write_request(RpcCode::Remove));

    assert_eq!(mu.updates.len(), 2);
    assert_eq!(mu.client_requests.len(), 2);
    assert_eq!(mu.updates[0].code, RpcCode::Put);
    assert_eq!(mu.updates[1].code, RpcCode::Remove);
}

#[test]
fn test_ready_for_commit_requires_log_and_acks() {
    let mu = Mutation::new();
    mu.set_left_ack_counts(2, 1);
    assert!(!mu.is_ready_for_commit());

    mu.set_logged();
    assert!(!mu.is_ready_for_commit());

    assert_eq!(mu.decrease_left_secondary_ack_count(), 1);
    assert_eq!(mu.decrease_left_secondary_ack_count(), 0);
    assert!(!mu.is_ready_for_commit());

    assert_eq!(mu.decrease_left_potential_secondary_ack_count(), 0);
    assert!(mu.is_ready_for_commit());
}

#[test]
fn test_singleton_group_is_ready_once_logged() {
    let mu = Mutation::new();
    mu.set_left_ack_counts(0, 0);
    assert!(!mu.is_ready_for_commit());
    mu.set_logged();
    assert!(mu.is_ready_for_commit());
}
