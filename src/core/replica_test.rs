use std::sync::atomic::AtomicI64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use bytes::Bytes;
use mockall::Sequence;

use crate::test_utils::build_replica;
use crate::test_utils::deny_all_access;
use crate::test_utils::mock_log;
use crate::test_utils::permissive_host;
use crate::test_utils::read_request;
use crate::test_utils::stateful_app;
use crate::test_utils::strict_host;
use crate::test_utils::test_app_info;
use crate::test_utils::test_node_config;
use crate::test_utils::write_request;
use crate::test_utils::MockTypeConfig;
use crate::Decree;
use crate::DiskMigrationStatus;
use crate::Gpid;
use crate::LearnerStatus;
use crate::ManualCompactionStatus;
use crate::MockMutationLog;
use crate::MockReplicaHost;
use crate::MockReplicationApp;
use crate::Mutation;
use crate::PartitionStatus;
use crate::Replica;
use crate::ReplicaConfiguration;
use crate::ReplicationError;
use crate::RpcCode;

type CapturedResponses = Arc<Mutex<Vec<(bool, std::result::Result<Bytes, ReplicationError>)>>>;

/// A host that records every client response it delivers.
fn capturing_host() -> (MockReplicaHost, CapturedResponses) {
    let responses: CapturedResponses = Arc::new(Mutex::new(Vec::new()));
    let captured = responses.clone();

    let mut host = strict_host();
    host.expect_respond_client()
        .returning(move |_, is_read, _, _, result| {
            captured.lock().unwrap().push((is_read, result));
        });
    host.expect_send_prepare().returning(|_, _, _, _, _| ());
    host.expect_send_prepare_ack().returning(|_, _, _, _, _| ());
    host.expect_defer_client_request().returning(|_, _, _, _| ());
    host.expect_on_replica_error().returning(|_, _| ());
    host.expect_trigger_checkpoint().returning(|_| ());
    (host, responses)
}

fn prepared_mutation(
    gpid: Gpid,
    ballot: i64,
    decree: Decree,
) -> Mutation {
    let mut mu = Mutation::new();
    mu.header.pid = gpid;
    mu.header.ballot = ballot;
    mu.header.decree = decree;
    mu.add_client_request(write_request(RpcCode::Put));
    mu
}

fn open_as(
    replica: &mut Replica<MockTypeConfig>,
    status: PartitionStatus,
    committed: Decree,
    fail_at: Option<Decree>,
) -> Arc<AtomicI64> {
    let (app, app_state) = stateful_app(committed, fail_at);
    replica.open(app, Arc::new(mock_log())).unwrap();
    replica
        .update_local_configuration(status, 1, None)
        .unwrap();
    app_state
}

/// # S1: primary happy path
///
/// ## Validate criterias
/// 1. Writes with decrees 1,2,3 all commit
/// 2. last_committed_decree == 3 and the app applied all three
/// 3. No write throttling rejects were counted
#[tokio::test]
async fn test_primary_happy_path() {
    let gpid = Gpid::new(1, 0);
    let mut replica = build_replica(gpid, permissive_host());
    let app_state = open_as(&mut replica, PartitionStatus::Primary, 0, None);

    for _ in 0..3 {
        replica.on_client_write(write_request(RpcCode::Put), false);
    }

    assert_eq!(replica.last_committed_decree(), 3);
    assert_eq!(app_state.load(Ordering::SeqCst), 3);
    replica.check_state_completeness();

    assert_eq!(
        crate::RECENT_WRITE_THROTTLING_REJECT_COUNT
            .with_label_values(&["1.0"])
            .get(),
        0
    );
}

/// # S2: stale read rejection on a newly promoted primary
///
/// A primary that has not yet re-committed its inherited prepared window
/// rejects non-backup reads; backup requests are served stale.
#[tokio::test]
async fn test_new_primary_rejects_stale_reads() {
    let gpid = Gpid::new(1, 1);
    let (host, responses) = capturing_host();
    let mut replica = build_replica(gpid, host);
    open_as(&mut replica, PartitionStatus::Primary, 7, None);
    replica
        .role_mut()
        .as_primary_mut()
        .unwrap()
        .last_prepare_decree_on_new_primary = 10;

    let backup_served_before = crate::BACKUP_REQUEST_QPS.with_label_values(&["temp"]).get();

    replica.on_client_read(read_request(false), false);
    {
        let responses = responses.lock().unwrap();
        let (is_read, result) = responses.last().unwrap();
        assert!(is_read);
        assert_eq!(
            result.clone().unwrap_err(),
            ReplicationError::InvalidState {
                status: PartitionStatus::Primary
            }
        );
    }

    replica.on_client_read(read_request(true), false);
    {
        let responses = responses.lock().unwrap();
        let (_, result) = responses.last().unwrap();
        assert_eq!(result.clone().unwrap(), Bytes::from_static(b"value"));
    }
    assert_eq!(
        crate::BACKUP_REQUEST_QPS.with_label_values(&["temp"]).get(),
        backup_served_before + 1
    );
}

/// # S3: secondary with a running checkpoint skips the apply
///
/// The decree still commits in the prepare list; the app catches up once
/// the checkpoint completes.
#[tokio::test]
async fn test_secondary_checkpoint_defers_apply() {
    let gpid = Gpid::new(1, 2);
    let mut replica = build_replica(gpid, permissive_host());
    let app_state = open_as(&mut replica, PartitionStatus::Secondary, 4, None);

    replica.begin_checkpoint().unwrap();
    replica
        .on_prepare(1, 5, prepared_mutation(gpid, 1, 5))
        .unwrap();

    // Committed in the window, but the app is untouched.
    assert_eq!(replica.last_committed_decree(), 5);
    assert_eq!(app_state.load(Ordering::SeqCst), 4);

    // Catch-up once the checkpoint task finishes.
    replica.on_checkpoint_completed();
    assert_eq!(app_state.load(Ordering::SeqCst), 5);
}

/// # S4: a learner outside the prepare-ok phases skips committed mutations
#[tokio::test]
async fn test_learner_skips_apply_outside_ok_phases() {
    let gpid = Gpid::new(1, 3);
    let mut replica = build_replica(gpid, permissive_host());
    let app_state = open_as(&mut replica, PartitionStatus::PotentialSecondary, 4, None);
    replica
        .set_learner_status(LearnerStatus::LearningWithPrepare)
        .unwrap();

    replica
        .on_prepare(1, 5, prepared_mutation(gpid, 1, 5))
        .unwrap();

    assert_eq!(replica.last_committed_decree(), 5);
    assert_eq!(app_state.load(Ordering::SeqCst), 4);
    assert_eq!(replica.status(), PartitionStatus::PotentialSecondary);
}

/// # S5: an apply failure on the primary is a fatal local failure
///
/// ## Validate criterias
/// 1. The replica transitions to ERROR and reports itself to the host
/// 2. Subsequent reads answer INVALID_STATE
#[tokio::test]
async fn test_local_failure_transitions_to_error() {
    let gpid = Gpid::new(1, 4);
    let (mut host, responses) = {
        let responses: CapturedResponses = Arc::new(Mutex::new(Vec::new()));
        let captured = responses.clone();
        let mut host = strict_host();
        host.expect_respond_client()
            .returning(move |_, is_read, _, _, result| {
                captured.lock().unwrap().push((is_read, result));
            });
        (host, responses)
    };
    host.expect_on_replica_error()
        .times(1)
        .withf(move |g, _| *g == gpid)
        .returning(|_, _| ());

    let mut replica = build_replica(gpid, host);
    open_as(&mut replica, PartitionStatus::Primary, 0, Some(4));

    for _ in 0..4 {
        replica.on_client_write(write_request(RpcCode::Put), false);
    }

    assert_eq!(replica.status(), PartitionStatus::Error);
    assert_eq!(replica.last_committed_decree(), 4);

    replica.on_client_read(read_request(false), false);
    let responses = responses.lock().unwrap();
    let (is_read, result) = responses.last().unwrap();
    assert!(is_read);
    assert_eq!(
        result.clone().unwrap_err(),
        ReplicationError::InvalidState {
            status: PartitionStatus::Error
        }
    );
}

/// # S6: close protocol ordering
///
/// cancel_background_work -> private log closed -> app closed exactly once;
/// every manager handle is gone afterwards.
#[tokio::test]
async fn test_close_order_and_manager_teardown() {
    let gpid = Gpid::new(1, 5);
    let mut app_info = test_app_info();
    app_info.duplicating = true;

    let mut seq = Sequence::new();
    let mut app = MockReplicationApp::new();
    app.expect_set_envs().returning(|_| ());
    app.expect_last_committed_decree().returning(|| 0);
    app.expect_last_durable_decree().returning(|| 0);
    app.expect_last_flushed_decree().returning(|| 0);
    app.expect_cancel_background_work()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| ());
    let mut log = MockMutationLog::new();
    log.expect_total_size().returning(|| 0);
    log.expect_close()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| ());
    app.expect_close()
        .times(1)
        .in_sequence(&mut seq)
        .withf(|clear_state| !*clear_state)
        .returning(|_| Ok(()));

    let mut replica: Replica<MockTypeConfig> = Replica::new(
        Arc::new(permissive_host()),
        gpid,
        app_info,
        "/tmp/replica-test/1.5",
        false,
        crate::test_utils::allow_all_access(),
        &test_node_config(),
    );
    replica.open(app, Arc::new(log)).unwrap();

    assert!(replica.duplication_mgr().unwrap().duplicating());
    replica.close().await.unwrap();

    assert!(replica.is_closed());
    assert!(replica.duplication_mgr().is_none());
    assert!(replica.backup_mgr().is_none());
    assert!(replica.bulk_loader().is_none());
    assert!(replica.split_mgr().is_none());

    // Idempotent.
    replica.close().await.unwrap();
}

/// # S7: manual compaction status parsing
#[tokio::test]
async fn test_manual_compact_status_parsing() {
    let gpid = Gpid::new(1, 6);
    let mut replica = build_replica(gpid, permissive_host());

    let states = [
        "last finish at [-]",
        "last finish at [-], recent enqueue at [1626771109]",
        "last finish at [-], recent enqueue at [1626771109], recent start at [1626771110]",
        "last finish at [1626771111], last used 6000 ms",
    ];
    let (mut app, _) = stateful_app(0, None);
    let call = AtomicUsize::new(0);
    app.expect_query_compact_state()
        .returning(move || states[call.fetch_add(1, Ordering::SeqCst) % states.len()].to_string());
    replica.open(app, Arc::new(mock_log())).unwrap();

    assert_eq!(
        replica.get_manual_compact_status().unwrap(),
        ManualCompactionStatus::Idle
    );
    assert_eq!(
        replica.get_manual_compact_status().unwrap(),
        ManualCompactionStatus::Queuing
    );
    assert_eq!(
        replica.get_manual_compact_status().unwrap(),
        ManualCompactionStatus::Running
    );
    assert_eq!(
        replica.get_manual_compact_status().unwrap(),
        ManualCompactionStatus::Finished
    );
}

/// Two-phase commit against a real group: nothing commits until every
/// group member acked its prepare.
#[tokio::test]
async fn test_commit_waits_for_group_acks() {
    let gpid = Gpid::new(1, 7);
    let sent = Arc::new(Mutex::new(Vec::new()));
    let mut host = strict_host();
    {
        let sent = sent.clone();
        host.expect_send_prepare()
            .returning(move |target, _, _, _, mu| {
                sent.lock().unwrap().push((target.to_string(), mu.header.decree));
            });
    }
    host.expect_respond_client().returning(|_, _, _, _, _| ());

    let mut replica = build_replica(gpid, host);
    let (app, app_state) = stateful_app(0, None);
    replica.open(app, Arc::new(mock_log())).unwrap();
    let membership = ReplicaConfiguration {
        pid: gpid,
        ballot: 1,
        primary: Some("test-host:34801".into()),
        secondaries: vec!["s1:34801".into(), "s2:34801".into()],
        learners: vec![],
    };
    replica
        .update_local_configuration(PartitionStatus::Primary, 1, Some(membership))
        .unwrap();

    replica.on_client_write(write_request(RpcCode::Put), false);

    // Prepared and fanned out, but not committed.
    assert_eq!(replica.max_prepared_decree(), 1);
    assert_eq!(replica.last_committed_decree(), 0);
    assert_eq!(
        sent.lock().unwrap().as_slice(),
        &[("s1:34801".to_string(), 1), ("s2:34801".to_string(), 1)]
    );

    replica.on_prepare_ack(1, 1, "s1:34801", None);
    assert_eq!(replica.last_committed_decree(), 0);

    replica.on_prepare_ack(1, 1, "s2:34801", None);
    assert_eq!(replica.last_committed_decree(), 1);
    assert_eq!(app_state.load(Ordering::SeqCst), 1);
}

/// A secondary acks a stale-ballot prepare with a StaleBallot verdict and
/// refuses the mutation.
#[tokio::test]
async fn test_secondary_rejects_stale_ballot_prepare() {
    let gpid = Gpid::new(1, 8);
    let acks = Arc::new(Mutex::new(Vec::new()));
    let mut host = strict_host();
    {
        let acks = acks.clone();
        host.expect_send_prepare_ack()
            .returning(move |_, _, ballot, decree, err| {
                acks.lock().unwrap().push((ballot, decree, err));
            });
    }

    let mut replica = build_replica(gpid, host);
    let (app, _) = stateful_app(0, None);
    replica.open(app, Arc::new(mock_log())).unwrap();
    replica
        .update_local_configuration(PartitionStatus::Secondary, 5, None)
        .unwrap();

    replica
        .on_prepare(3, 1, prepared_mutation(gpid, 3, 1))
        .unwrap();

    let acks = acks.lock().unwrap();
    assert_eq!(
        acks.as_slice(),
        &[(
            3,
            1,
            Some(ReplicationError::StaleBallot {
                request: 3,
                current: 5
            })
        )]
    );
    assert_eq!(replica.last_committed_decree(), 0);
}

/// Reads and writes rejected by the access controller answer ACL_DENY.
#[tokio::test]
async fn test_acl_denied_request() {
    let gpid = Gpid::new(1, 9);
    let (host, responses) = capturing_host();
    let mut replica: Replica<MockTypeConfig> = Replica::new(
        Arc::new(host),
        gpid,
        test_app_info(),
        "/tmp/replica-test/1.9",
        false,
        deny_all_access(),
        &test_node_config(),
    );

    replica.on_client_read(read_request(false), false);
    replica.on_client_write(write_request(RpcCode::Put), false);

    let responses = responses.lock().unwrap();
    assert_eq!(responses.len(), 2);
    for (_, result) in responses.iter() {
        assert_eq!(result.clone().unwrap_err(), ReplicationError::AclDeny);
    }
}

/// Requests in the hash range migrating to the split child are rejected
/// before any status check.
#[tokio::test]
async fn test_split_hash_range_rejection() {
    let gpid = Gpid::new(1, 0);
    let (host, responses) = capturing_host();
    let mut replica = build_replica(gpid, host);
    replica
        .split_mgr_mut()
        .unwrap()
        .start_split(Gpid::new(1, 8));

    // 8 % 16 routes to the child partition (1.8).
    let mut request = read_request(false);
    request.partition_hash = 8;
    replica.on_client_read(request, false);

    let responses = responses.lock().unwrap();
    let (_, result) = responses.last().unwrap();
    assert_eq!(result.clone().unwrap_err(), ReplicationError::Splitting);
}

/// Reads on INACTIVE and POTENTIAL_SECONDARY replicas answer INVALID_STATE.
#[tokio::test]
async fn test_read_rejected_outside_serving_roles() {
    let gpid = Gpid::new(2, 0);
    let (host, responses) = capturing_host();
    let mut replica = build_replica(gpid, host);

    replica.on_client_read(read_request(false), false);
    {
        let responses = responses.lock().unwrap();
        let (_, result) = responses.last().unwrap();
        assert_eq!(
            result.clone().unwrap_err(),
            ReplicationError::InvalidState {
                status: PartitionStatus::Inactive
            }
        );
    }

    open_as(&mut replica, PartitionStatus::PotentialSecondary, 0, None);
    replica.on_client_read(read_request(false), false);
    let responses = responses.lock().unwrap();
    let (_, result) = responses.last().unwrap();
    assert_eq!(
        result.clone().unwrap_err(),
        ReplicationError::InvalidState {
            status: PartitionStatus::PotentialSecondary
        }
    );
}

/// Lifecycle transition preconditions enforced by the core.
#[tokio::test]
async fn test_transition_preconditions() {
    let gpid = Gpid::new(2, 1);
    let mut replica = build_replica(gpid, permissive_host());
    let (app, _) = stateful_app(0, None);
    replica.open(app, Arc::new(mock_log())).unwrap();

    // Ballots never go backwards.
    replica
        .update_local_configuration(PartitionStatus::PotentialSecondary, 3, None)
        .unwrap();
    assert!(replica
        .update_local_configuration(PartitionStatus::Secondary, 2, None)
        .is_err());

    // A learner graduates only after learning succeeded.
    assert!(replica
        .update_local_configuration(PartitionStatus::Secondary, 4, None)
        .is_err());
    replica
        .set_learner_status(LearnerStatus::LearningSucceeded)
        .unwrap();
    replica
        .update_local_configuration(PartitionStatus::Secondary, 4, None)
        .unwrap();
    assert_eq!(replica.status(), PartitionStatus::Secondary);

    // No path from SECONDARY back to a learner.
    assert!(replica
        .update_local_configuration(PartitionStatus::PotentialSecondary, 5, None)
        .is_err());
    assert_eq!(replica.get_ballot(), 4);
}

/// A demoted primary abandons its preparing mutations and answers their
/// clients INVALID_STATE.
#[tokio::test]
async fn test_demotion_abandons_preparing_mutations() {
    let gpid = Gpid::new(2, 2);
    let (host, responses) = capturing_host();
    let mut replica = build_replica(gpid, host);
    let (app, _) = stateful_app(0, None);
    replica.open(app, Arc::new(mock_log())).unwrap();
    let membership = ReplicaConfiguration {
        pid: gpid,
        ballot: 1,
        primary: Some("test-host:34801".into()),
        secondaries: vec!["s1:34801".into()],
        learners: vec![],
    };
    replica
        .update_local_configuration(PartitionStatus::Primary, 1, Some(membership))
        .unwrap();

    // Prepared but never acked: stuck in the pipeline.
    replica.on_client_write(write_request(RpcCode::Put), false);
    assert_eq!(replica.max_prepared_decree(), 1);
    assert_eq!(replica.last_committed_decree(), 0);

    replica
        .update_local_configuration(PartitionStatus::Secondary, 2, None)
        .unwrap();

    assert_eq!(replica.max_prepared_decree(), 0);
    let responses = responses.lock().unwrap();
    let (is_read, result) = responses.last().unwrap();
    assert!(!is_read);
    assert_eq!(
        result.clone().unwrap_err(),
        ReplicationError::InvalidState {
            status: PartitionStatus::Primary
        }
    );
}

/// Invariant: the checkpoint trigger is uniformly randomized within
/// [max/2, max] of the configured interval.
#[tokio::test]
async fn test_checkpoint_trigger_randomization_range() {
    let gpid = Gpid::new(2, 3);
    let mut replica = build_replica(gpid, permissive_host());
    let max_ms = test_node_config().replication.checkpoint_max_interval_hours * 3_600_000;

    for _ in 0..64 {
        replica.update_last_checkpoint_generate_time();
        let delta = replica.next_checkpoint_interval_trigger_time_ms()
            - replica.last_checkpoint_generate_time_ms();
        assert!(
            delta >= max_ms / 2 && delta <= max_ms,
            "trigger delta {delta} outside [{}, {}]",
            max_ms / 2,
            max_ms
        );
    }
}

/// Invariant: last_prepared_decree never decreases and breaks on a ballot
/// drop or an unlogged entry.
#[tokio::test]
async fn test_last_prepared_decree_scan() {
    let gpid = Gpid::new(2, 4);
    let mut replica = build_replica(gpid, permissive_host());

    let pin = |replica: &mut Replica<MockTypeConfig>, ballot, decree, logged| {
        let mut mu = Mutation::new();
        mu.header.pid = gpid;
        mu.header.ballot = ballot;
        mu.header.decree = decree;
        let mu = Arc::new(mu);
        if logged {
            mu.set_logged();
        }
        replica
            .prepare_list_mut()
            .prepare(mu.clone(), PartitionStatus::Secondary)
            .unwrap();
        mu
    };

    pin(&mut replica, 1, 1, true);
    pin(&mut replica, 1, 2, true);
    let d3 = pin(&mut replica, 2, 3, false);
    assert_eq!(replica.last_prepared_decree(), 2);

    d3.set_logged();
    assert_eq!(replica.last_prepared_decree(), 3);

    // A stale-ballot entry ends the safely prepared tail.
    pin(&mut replica, 1, 4, true);
    assert_eq!(replica.last_prepared_decree(), 3);
}

/// Close is a contract violation outside the terminal states.
#[tokio::test]
#[should_panic(expected = "invalid state")]
async fn test_close_requires_terminal_state() {
    let gpid = Gpid::new(2, 5);
    let mut replica = build_replica(gpid, permissive_host());
    open_as(&mut replica, PartitionStatus::Primary, 0, None);
    let _ = replica.close().await;
}

/// A replica whose disk migration reached MOVED may close from any role;
/// the close path flips the directory over.
#[tokio::test]
async fn test_close_after_disk_migration() {
    let gpid = Gpid::new(2, 6);
    let mut replica = build_replica(gpid, permissive_host());
    open_as(&mut replica, PartitionStatus::Secondary, 0, None);

    replica
        .disk_migrator_mut()
        .unwrap()
        .start_migration("/tmp/replica-test/migrated/2.6".into());
    replica.disk_migrator_mut().unwrap().mark_moved();

    replica.close().await.unwrap();
    assert_eq!(
        replica.dir().to_string_lossy(),
        "/tmp/replica-test/migrated/2.6"
    );
    assert_eq!(
        replica.disk_migrator().unwrap().status(),
        DiskMigrationStatus::Closed
    );
}

/// need_restore seeds the restore marker env propagated to the app.
#[tokio::test]
async fn test_need_restore_env() {
    let gpid = Gpid::new(2, 7);
    let replica: Replica<MockTypeConfig> = Replica::new(
        Arc::new(permissive_host()),
        gpid,
        test_app_info(),
        "/tmp/replica-test/2.7",
        true,
        crate::test_utils::allow_all_access(),
        &test_node_config(),
    );
    assert_eq!(
        replica.extra_envs().get(crate::FORCE_RESTORE_ENV),
        Some(&"true".to_string())
    );
}

/// Read throttling counts its verdicts.
#[tokio::test]
async fn test_read_throttling_counters() {
    let gpid = Gpid::new(2, 8);
    let mut node_config = test_node_config();
    node_config.throttling.read.enabled = true;
    node_config.throttling.read.qps_limit = 1;

    let mut replica: Replica<MockTypeConfig> = Replica::new(
        Arc::new(permissive_host()),
        gpid,
        test_app_info(),
        "/tmp/replica-test/2.8",
        false,
        crate::test_utils::allow_all_access(),
        &node_config,
    );
    open_as(&mut replica, PartitionStatus::Primary, 0, None);

    for _ in 0..3 {
        replica.on_client_read(read_request(false), false);
    }
    let delays = crate::RECENT_READ_THROTTLING_DELAY_COUNT
        .with_label_values(&["2.8"])
        .get();
    let rejects = crate::RECENT_READ_THROTTLING_REJECT_COUNT
        .with_label_values(&["2.8"])
        .get();
    assert!(delays + rejects >= 2, "delays={delays} rejects={rejects}");

    // ignore_throttling bypasses the controller entirely.
    replica.on_client_read(read_request(false), true);
}

/// Non-idempotent writes are rejected while duplication is enabled.
#[tokio::test]
async fn test_duplication_rejects_non_idempotent_writes() {
    let gpid = Gpid::new(2, 9);
    let mut app_info = test_app_info();
    app_info.duplicating = true;

    let (host, responses) = capturing_host();
    let mut replica: Replica<MockTypeConfig> = Replica::new(
        Arc::new(host),
        gpid,
        app_info,
        "/tmp/replica-test/2.9",
        false,
        crate::test_utils::allow_all_access(),
        &test_node_config(),
    );
    let app_state = open_as(&mut replica, PartitionStatus::Primary, 0, None);

    replica.on_client_write(write_request(RpcCode::Incr), false);
    {
        let responses = responses.lock().unwrap();
        let (_, result) = responses.last().unwrap();
        assert_eq!(
            result.clone().unwrap_err(),
            ReplicationError::OperationDisabled
        );
    }

    // Idempotent writes still flow.
    replica.on_client_write(write_request(RpcCode::Put), false);
    assert_eq!(app_state.load(Ordering::SeqCst), 1);
}

/// INACTIVE replicas still apply perfectly aligned decrees (log replay
/// after a role change), while reads stay rejected.
#[tokio::test]
async fn test_inactive_silent_apply_on_aligned_decree() {
    let gpid = Gpid::new(3, 0);
    let mut replica = build_replica(gpid, permissive_host());
    let (app, app_state) = stateful_app(0, None);
    replica.open(app, Arc::new(mock_log())).unwrap();

    let mu = Arc::new({
        let mut mu = prepared_mutation(gpid, 0, 1);
        mu.client_requests.clear();
        mu.updates.clear();
        mu
    });
    mu.set_logged();
    replica.execute_mutation(&mu);
    assert_eq!(app_state.load(Ordering::SeqCst), 1);

    // A misaligned decree is skipped silently.
    let mut skipped = prepared_mutation(gpid, 0, 5);
    skipped.client_requests.clear();
    skipped.updates.clear();
    let skipped = Arc::new(skipped);
    skipped.set_logged();
    replica.execute_mutation(&skipped);
    assert_eq!(app_state.load(Ordering::SeqCst), 1);
}
