use std::collections::HashMap;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use bytes::Bytes;

use crate::config::ReplicaNodeConfig;
use crate::storage::AppInfo;
use crate::test_utils::MockTypeConfig;
use crate::utils::time::now_ns;
use crate::ClientRequest;
use crate::Decree;
use crate::Gpid;
use crate::MockAccessController;
use crate::MockMutationLog;
use crate::MockReplicaHost;
use crate::MockReplicationApp;
use crate::Replica;
use crate::RpcCode;
use crate::StorageError;

pub(crate) fn test_app_info() -> AppInfo {
    AppInfo {
        app_id: 1,
        app_name: "temp".into(),
        app_type: "rocksdb".into(),
        partition_count: 8,
        max_replica_count: 3,
        envs: HashMap::new(),
        duplicating: false,
    }
}

pub(crate) fn test_node_config() -> ReplicaNodeConfig {
    ReplicaNodeConfig::default()
}

pub(crate) fn write_request(code: RpcCode) -> ClientRequest {
    ClientRequest {
        code,
        payload: Bytes::from_static(b"k=v"),
        partition_hash: 0,
        is_backup_request: false,
        start_time_ns: now_ns(),
    }
}

pub(crate) fn read_request(is_backup_request: bool) -> ClientRequest {
    ClientRequest {
        code: RpcCode::Get,
        payload: Bytes::from_static(b"k"),
        partition_hash: 0,
        is_backup_request,
        start_time_ns: now_ns(),
    }
}

/// A host that accepts every outbound call without asserting on it.
pub(crate) fn permissive_host() -> MockReplicaHost {
    let mut host = MockReplicaHost::new();
    host.expect_address().return_const("test-host:34801".to_string());
    host.expect_respond_client().returning(|_, _, _, _, _| ());
    host.expect_defer_client_request().returning(|_, _, _, _| ());
    host.expect_send_prepare().returning(|_, _, _, _, _| ());
    host.expect_send_prepare_ack().returning(|_, _, _, _, _| ());
    host.expect_on_replica_error().returning(|_, _| ());
    host.expect_trigger_checkpoint().returning(|_| ());
    host
}

/// A bare host mock with only the address wired; callers add the
/// expectations they assert on.
pub(crate) fn strict_host() -> MockReplicaHost {
    let mut host = MockReplicaHost::new();
    host.expect_address().return_const("test-host:34801".to_string());
    host
}

pub(crate) fn allow_all_access() -> MockAccessController {
    let mut ac = MockAccessController::new();
    ac.expect_allowed().returning(|_| true);
    ac
}

pub(crate) fn deny_all_access() -> MockAccessController {
    let mut ac = MockAccessController::new();
    ac.expect_allowed().returning(|_| false);
    ac
}

/// A stateful application mock: tracks its committed decree through
/// `apply_mutation`, optionally failing at one decree.
pub(crate) fn stateful_app(
    initial_committed: Decree,
    fail_at: Option<Decree>,
) -> (MockReplicationApp, Arc<AtomicI64>) {
    let committed = Arc::new(AtomicI64::new(initial_committed));
    let mut app = MockReplicationApp::new();

    app.expect_set_envs().returning(|_| ());
    {
        let committed = committed.clone();
        app.expect_last_committed_decree()
            .returning(move || committed.load(Ordering::SeqCst));
    }
    app.expect_last_durable_decree().returning(|| 0);
    app.expect_last_flushed_decree().returning(|| 0);
    {
        let committed = committed.clone();
        app.expect_apply_mutation().returning(move |mu| {
            if fail_at == Some(mu.header.decree) {
                return Err(StorageError::AppError("injected apply failure".into()).into());
            }
            committed.store(mu.header.decree, Ordering::SeqCst);
            Ok(())
        });
    }
    app.expect_on_request()
        .returning(|_| Ok(Bytes::from_static(b"value")));
    app.expect_cancel_background_work().returning(|_| ());
    app.expect_close().returning(|_| Ok(()));

    (app, committed)
}

pub(crate) fn mock_log() -> MockMutationLog {
    let mut log = MockMutationLog::new();
    let next_offset = AtomicI64::new(0);
    log.expect_append()
        .returning(move |_| Ok(next_offset.fetch_add(1, Ordering::SeqCst)));
    log.expect_total_size().returning(|| 64 * 1024);
    log.expect_close().returning(|| ());
    log
}

pub(crate) fn build_replica(
    gpid: Gpid,
    host: MockReplicaHost,
) -> Replica<MockTypeConfig> {
    Replica::new(
        Arc::new(host),
        gpid,
        test_app_info(),
        format!("/tmp/replica-test/{gpid}"),
        false,
        allow_all_access(),
        &test_node_config(),
    )
}
