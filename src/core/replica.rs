//! The central replica object: owner of one partition's durable state.
//!
//! A replica applies ordered mutations to its application engine and drives
//! the two-phase commit protocol against its replica group. All calls into
//! one replica are serialized by the host; nothing here is re-entered
//! concurrently. Suspended work (the checkpoint timer, tracked async tasks)
//! completes through continuations the host posts back onto the same
//! per-replica queue.
//!
//! Invariant discipline, checked at every quiescent point:
//! `max_prepared_decree() >= last_committed_decree() >= last_durable_decree()`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use bytes::Bytes;
use rand::Rng;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::checkpoint::CheckpointTimer;
use super::checkpoint::TRIGGER_DISARMED;
use crate::alias::ACOF;
use crate::alias::AOF;
use crate::alias::HOF;
use crate::alias::LOF;
use crate::config::ReplicaNodeConfig;
use crate::config::ReplicationConfig;
use crate::constants::FORCE_RESTORE_ENV;
use crate::storage::save_app_info;
use crate::storage::AppInfo;
use crate::storage::DetectHotkeyRequest;
use crate::storage::DetectHotkeyResponse;
use crate::utils::time::now_ms;
use crate::utils::time::now_ns;
use crate::utils::time::now_us;
use crate::utils::TaskTracker;
use crate::AccessController;
use crate::BackupManager;
use crate::Ballot;
use crate::BulkLoader;
use crate::ClientRequest;
use crate::CommitType;
use crate::Decree;
use crate::DiskMigrationStatus;
use crate::DiskMigrator;
use crate::DuplicationManager;
use crate::Error;
use crate::Gpid;
use crate::LearnerStatus;
use crate::ManualCompactionStatus;
use crate::Mutation;
use crate::MutationLog;
use crate::PartitionStatus;
use crate::PotentialSecondaryState;
use crate::PrepareList;
use crate::PrimaryState;
use crate::ReplicaConfiguration;
use crate::ReplicaCounters;
use crate::ReplicaHost;
use crate::ReplicationApp;
use crate::ReplicationError;
use crate::Result;
use crate::RoleState;
use crate::SecondaryState;
use crate::SplitManager;
use crate::SplitState;
use crate::ThrottleVerdict;
use crate::ThrottlingController;
use crate::TypeConfig;

pub struct Replica<T>
where T: TypeConfig
{
    host: Arc<HOF<T>>,
    app_info: AppInfo,
    dir: PathBuf,
    name: String,

    config: ReplicaConfiguration,
    role: RoleState,
    prepare_list: PrepareList,

    app: Option<AOF<T>>,
    private_log: Option<Arc<LOF<T>>>,
    access_controller: ACOF<T>,

    // Managers, torn down in close() in this order.
    duplication_mgr: Option<DuplicationManager>,
    backup_mgr: Option<BackupManager>,
    bulk_loader: Option<BulkLoader>,
    split_mgr: Option<SplitManager>,
    disk_migrator: Option<DiskMigrator>,

    counters: ReplicaCounters,
    read_throttler: ThrottlingController,
    write_throttler: ThrottlingController,

    tracker: TaskTracker,
    checkpoint_timer: Option<CheckpointTimer>,

    options: Arc<ReplicationConfig>,

    deny_client_write: bool,
    is_initializing: bool,
    inactive_is_transient: bool,
    closed: bool,

    create_time_ms: u64,
    last_config_change_time_ms: u64,
    last_checkpoint_generate_time_ms: u64,
    next_checkpoint_interval_trigger_time_ms: Arc<AtomicU64>,

    extra_envs: HashMap<String, String>,
}

impl<T> Replica<T>
where T: TypeConfig
{
    pub fn new(
        host: Arc<HOF<T>>,
        gpid: Gpid,
        app_info: AppInfo,
        dir: impl Into<PathBuf>,
        need_restore: bool,
        access_controller: ACOF<T>,
        node_config: &ReplicaNodeConfig,
    ) -> Self {
        assert!(!app_info.app_type.is_empty(), "app_type must be set");

        let dir = dir.into();
        let name = format!("{}@{}", gpid, host.address());
        let options = Arc::new(node_config.replication.clone());

        let create_time_ms = now_ms();
        let next_trigger = Arc::new(AtomicU64::new(TRIGGER_DISARMED));

        let mut extra_envs = HashMap::new();
        if need_restore {
            // add an extra env for restore
            extra_envs.insert(FORCE_RESTORE_ENV.to_string(), "true".to_string());
        }

        let counters = ReplicaCounters::register(gpid, &app_info.app_name);
        let duplicating = app_info.duplicating;
        let partition_count = app_info.partition_count;

        let checkpoint_timer =
            CheckpointTimer::spawn::<T>(gpid, host.clone(), next_trigger.clone());

        let mut replica = Self {
            host,
            app_info,
            dir: dir.clone(),
            name: name.clone(),

            config: ReplicaConfiguration {
                pid: gpid,
                ballot: 0,
                ..Default::default()
            },
            role: RoleState::Inactive { transient: false },
            prepare_list: PrepareList::new(0, options.max_mutation_count_in_prepare_list),

            app: None,
            private_log: None,
            access_controller,

            duplication_mgr: Some(DuplicationManager::new(gpid, name.clone(), duplicating)),
            backup_mgr: Some(BackupManager::new(gpid, name.clone())),
            bulk_loader: Some(BulkLoader::new(gpid, name.clone())),
            split_mgr: Some(SplitManager::new(gpid, name.clone(), partition_count)),
            disk_migrator: Some(DiskMigrator::new(
                gpid,
                name,
                dir.to_string_lossy().into_owned(),
            )),

            counters,
            read_throttler: ThrottlingController::new(node_config.throttling.read.clone()),
            write_throttler: ThrottlingController::new(node_config.throttling.write.clone()),

            tracker: TaskTracker::new(),
            checkpoint_timer: Some(checkpoint_timer),

            options,

            deny_client_write: false,
            is_initializing: true,
            inactive_is_transient: false,
            closed: false,

            create_time_ms,
            last_config_change_time_ms: create_time_ms,
            last_checkpoint_generate_time_ms: create_time_ms,
            next_checkpoint_interval_trigger_time_ms: next_trigger,

            extra_envs,
        };
        replica.update_last_checkpoint_generate_time();
        replica
    }

    /// Attach the application engine and the private log, completing
    /// initialization. The prepare pipeline restarts from the app's commit
    /// point.
    pub fn open(
        &mut self,
        app: AOF<T>,
        private_log: Arc<LOF<T>>,
    ) -> Result<()> {
        if self.closed {
            return Err(ReplicationError::Closed.into());
        }
        assert!(self.app.is_none(), "replica already opened");

        app.set_envs(&self.extra_envs);
        let committed = app.last_committed_decree();
        self.prepare_list.reset(committed);
        self.update_private_log_size_counter(&private_log);

        self.app = Some(app);
        self.private_log = Some(private_log);
        self.is_initializing = false;

        info!(
            "{}: replica opened, app.last_committed_decree = {}",
            self.name, committed
        );
        Ok(())
    }

    //            //
    // Queries    //
    //            //

    pub fn status(&self) -> PartitionStatus {
        self.role.status()
    }

    pub fn get_gpid(&self) -> Gpid {
        self.config.pid
    }

    pub fn get_ballot(&self) -> Ballot {
        self.config.ballot
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    pub fn app_info(&self) -> &AppInfo {
        &self.app_info
    }

    pub fn extra_envs(&self) -> &HashMap<String, String> {
        &self.extra_envs
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_initializing(&self) -> bool {
        self.is_initializing
    }

    pub fn last_committed_decree(&self) -> Decree {
        self.prepare_list.last_committed_decree()
    }

    pub fn max_prepared_decree(&self) -> Decree {
        self.prepare_list.max_decree()
    }

    pub fn last_durable_decree(&self) -> Decree {
        self.app.as_ref().map_or(0, |app| app.last_durable_decree())
    }

    pub fn last_flushed_decree(&self) -> Decree {
        self.app.as_ref().map_or(0, |app| app.last_flushed_decree())
    }

    /// The safely prepared tail a new primary may commit: the highest decree
    /// reachable from the commit point through logged mutations whose
    /// ballots never decrease.
    pub fn last_prepared_decree(&self) -> Decree {
        let mut last_ballot: Ballot = 0;
        let mut start = self.last_committed_decree();
        loop {
            match self.prepare_list.get_mutation_by_decree(start + 1) {
                Some(mu) if mu.header.ballot >= last_ballot && mu.is_logged() => {
                    start += 1;
                    last_ballot = mu.header.ballot;
                }
                _ => break,
            }
        }
        start
    }

    pub fn verbose_commit_log(&self) -> bool {
        self.options.verbose_commit_log
    }

    //            //
    // Statistics //
    //            //

    pub fn update_commit_qps(
        &self,
        count: u64,
    ) {
        crate::REPLICA_COMMIT_QPS.inc_by(count);
    }

    /// prepare >= commit >= durable
    pub fn check_state_completeness(&self) {
        assert!(
            self.max_prepared_decree() >= self.last_committed_decree(),
            "{} VS {}",
            self.max_prepared_decree(),
            self.last_committed_decree()
        );
        assert!(
            self.last_committed_decree() >= self.last_durable_decree(),
            "{} VS {}",
            self.last_committed_decree(),
            self.last_durable_decree()
        );
    }

    //                  //
    // Client read path //
    //                  //

    pub fn on_client_read(
        &mut self,
        request: ClientRequest,
        ignore_throttling: bool,
    ) {
        if !self.access_controller.allowed(&request) {
            self.response_client_read(&request, Err(ReplicationError::AclDeny));
            return;
        }

        if let Some(split_mgr) = &self.split_mgr {
            if split_mgr.should_reject_request(request.partition_hash) {
                self.response_client_read(&request, Err(ReplicationError::Splitting));
                return;
            }
        }

        let status = self.status();
        if status == PartitionStatus::Inactive || status == PartitionStatus::PotentialSecondary {
            self.response_client_read(&request, Err(ReplicationError::InvalidState { status }));
            return;
        }

        if !ignore_throttling {
            match self.read_throttler.verdict(now_ms()) {
                ThrottleVerdict::Reject => {
                    self.counters.recent_read_throttling_reject_count.inc();
                    self.response_client_read(&request, Err(ReplicationError::Busy));
                    return;
                }
                ThrottleVerdict::Delay(delay) => {
                    self.counters.recent_read_throttling_delay_count.inc();
                    self.host
                        .defer_client_request(self.get_gpid(), true, &request, delay);
                    return;
                }
                ThrottleVerdict::NotThrottled => {}
            }
        }

        if !request.is_backup_request {
            // only backup request is allowed to read from a stale replica
            if status != PartitionStatus::Primary {
                self.response_client_read(&request, Err(ReplicationError::InvalidState { status }));
                return;
            }

            // a small window where the state is not the latest yet
            if let Some(ps) = self.role.as_primary() {
                if self.last_committed_decree() < ps.last_prepare_decree_on_new_primary {
                    error!(
                        "{}: last_committed_decree({}) < last_prepare_decree_on_new_primary({})",
                        self.name,
                        self.last_committed_decree(),
                        ps.last_prepare_decree_on_new_primary
                    );
                    self.response_client_read(
                        &request,
                        Err(ReplicationError::InvalidState { status }),
                    );
                    return;
                }
            }
        } else {
            self.counters.backup_request_qps.inc();
        }

        let start_time_ns = now_ns();
        let app = self.app.as_ref().expect("app must be open while serving reads");
        let result = app
            .on_request(&request)
            .map_err(|e| ReplicationError::AppFailure(e.to_string()));

        // If the corresponding counter exists, count the duration of this
        // operation.
        if let Some(latency) = self.counters.table_level_latency(request.code) {
            latency.observe((now_ns() - start_time_ns) as f64);
        }

        self.response_client_read(&request, result);
    }

    //                   //
    // Client write path //
    //                   //

    pub fn on_client_write(
        &mut self,
        request: ClientRequest,
        ignore_throttling: bool,
    ) {
        if !self.access_controller.allowed(&request) {
            self.response_client_write(&request, Err(ReplicationError::AclDeny));
            return;
        }

        if let Some(split_mgr) = &self.split_mgr {
            if split_mgr.should_reject_request(request.partition_hash) {
                self.response_client_write(&request, Err(ReplicationError::Splitting));
                return;
            }
        }

        let status = self.status();
        if status != PartitionStatus::Primary {
            self.response_client_write(&request, Err(ReplicationError::InvalidState { status }));
            return;
        }

        if self.deny_client_write {
            self.response_client_write(&request, Err(ReplicationError::Busy));
            return;
        }

        if !ignore_throttling {
            match self.write_throttler.verdict(now_ms()) {
                ThrottleVerdict::Reject => {
                    self.counters.recent_write_throttling_reject_count.inc();
                    self.response_client_write(&request, Err(ReplicationError::Busy));
                    return;
                }
                ThrottleVerdict::Delay(delay) => {
                    self.counters.recent_write_throttling_delay_count.inc();
                    self.host
                        .defer_client_request(self.get_gpid(), false, &request, delay);
                    return;
                }
                ThrottleVerdict::NotThrottled => {}
            }
        }

        // Non-idempotent writes cannot be shipped to a remote cluster.
        if request.code.is_non_idempotent_write()
            && self
                .duplication_mgr
                .as_ref()
                .is_some_and(|mgr| mgr.duplicating())
        {
            self.counters.dup_disabled_non_idempotent_write_count.inc();
            self.response_client_write(&request, Err(ReplicationError::OperationDisabled));
            return;
        }

        let running = self.max_prepared_decree() - self.last_committed_decree();
        let next = {
            let ps = self
                .role
                .as_primary_mut()
                .expect("primary state must exist after the status check");
            ps.write_queue.enqueue(request);
            ps.write_queue.check_possible_work(running)
        };

        if let Some(mu) = next {
            if let Err(e) = self.init_prepare(mu, false) {
                error!("{}: init_prepare failed: {:?}", self.name, e);
            }
        }
    }

    //                      //
    // Two-phase commit     //
    //                      //

    /// Construct a mutation with the header filled for this replica.
    pub fn new_mutation(
        &self,
        decree: Decree,
    ) -> Mutation {
        let mut mu = Mutation::new();
        mu.header.pid = self.get_gpid();
        mu.header.ballot = self.get_ballot();
        mu.header.decree = decree;
        mu
    }

    /// Admit one mutation into the prepare pipeline: assign its decree, pin
    /// it, write it to the private log, and fan the prepare out to the
    /// group.
    pub fn init_prepare(
        &mut self,
        mut mu: Mutation,
        reconciliation: bool,
    ) -> Result<()> {
        assert_eq!(
            self.status(),
            PartitionStatus::Primary,
            "only the primary admits mutations"
        );
        self.check_state_completeness();

        if !reconciliation {
            mu.header.decree = self.max_prepared_decree() + 1;
        } else {
            assert!(
                mu.header.decree > self.last_committed_decree(),
                "reconciliation below the commit point"
            );
        }
        mu.header.pid = self.get_gpid();
        mu.header.ballot = self.get_ballot();
        mu.header.timestamp_us = now_us();

        let (secondaries, learners) = {
            let ps = self
                .role
                .as_primary()
                .expect("primary state must exist while preparing");
            (
                ps.membership.secondaries.clone(),
                ps.membership.learners.clone(),
            )
        };
        mu.set_left_ack_counts(secondaries.len() as i32, learners.len() as i32);

        debug!(
            "{}: init_prepare mutation {}, request_count = {}",
            self.name,
            mu.name(),
            mu.client_requests.len()
        );

        let log = self
            .private_log
            .as_ref()
            .expect("private log must be open on the primary")
            .clone();
        match log.append(&mu) {
            Ok(offset) => mu.header.log_offset = offset,
            Err(e) => {
                self.handle_local_failure(e);
                return Err(ReplicationError::LogFailure("append failed".into()).into());
            }
        }

        let mu = Arc::new(mu);
        self.prepare_list
            .prepare(mu.clone(), PartitionStatus::Primary)?;
        mu.set_logged();
        self.update_private_log_size_counter(&log);

        let ballot = self.get_ballot();
        let committed_decree = self.last_committed_decree();
        for target in secondaries.iter().chain(learners.iter()) {
            self.host.send_prepare(
                target,
                self.get_gpid(),
                ballot,
                committed_decree,
                mu.clone(),
            );
        }

        // A singleton group needs no remote acks.
        self.try_commit_ready();
        Ok(())
    }

    /// A group member acknowledged (or failed) one prepared decree.
    pub fn on_prepare_ack(
        &mut self,
        ballot: Ballot,
        decree: Decree,
        node: &str,
        err: Option<ReplicationError>,
    ) {
        if self.status() != PartitionStatus::Primary {
            warn!(
                "{}: prepare ack for decree {} ignored, replica is {}",
                self.name,
                decree,
                self.status()
            );
            return;
        }
        if ballot != self.get_ballot() {
            warn!(
                "{}: prepare ack under ballot {} ignored, current ballot is {}",
                self.name,
                ballot,
                self.get_ballot()
            );
            return;
        }

        let Some(mu) = self.prepare_list.get_mutation_by_decree(decree) else {
            warn!(
                "{}: prepare ack for decree {} ignored, not in prepare window",
                self.name, decree
            );
            return;
        };

        if let Some(e) = err {
            // The meta service decides whether the member is removed; the
            // mutation stays pending until reconfiguration.
            error!(
                "{}: prepare of mutation {} failed on {}: {}",
                self.name,
                mu.name(),
                node,
                e
            );
            return;
        }

        let is_secondary = self
            .role
            .as_primary()
            .map(|ps| ps.membership.secondaries.iter().any(|s| s == node))
            .unwrap_or(false);
        if is_secondary {
            mu.decrease_left_secondary_ack_count();
        } else {
            mu.decrease_left_potential_secondary_ack_count();
        }

        self.try_commit_ready();
    }

    /// A prepare arrived from the primary (secondary/learner side).
    pub fn on_prepare(
        &mut self,
        ballot: Ballot,
        committed_decree: Decree,
        mut mu: Mutation,
    ) -> Result<()> {
        if self.closed {
            return Err(ReplicationError::Closed.into());
        }

        let status = self.status();
        let decree = mu.header.decree;
        match status {
            PartitionStatus::Secondary
            | PartitionStatus::PotentialSecondary
            | PartitionStatus::PartitionSplit => {}
            _ => {
                self.ack_prepare(
                    ballot,
                    decree,
                    Some(ReplicationError::InvalidState { status }),
                );
                return Ok(());
            }
        }

        if ballot < self.get_ballot() {
            self.ack_prepare(
                ballot,
                decree,
                Some(ReplicationError::StaleBallot {
                    request: ballot,
                    current: self.get_ballot(),
                }),
            );
            return Ok(());
        }
        if ballot > self.get_ballot() {
            info!(
                "{}: ballot advanced {} -> {} on prepare",
                self.name,
                self.get_ballot(),
                ballot
            );
            self.config.ballot = ballot;
        }

        // A learner only joins the prepare flow in the prepare-accepting
        // phases of learning.
        if let Some(ls) = self.role.as_potential_secondary() {
            if !ls.learning_status.accepts_prepare() {
                self.ack_prepare(
                    ballot,
                    decree,
                    Some(ReplicationError::InvalidState { status }),
                );
                return Ok(());
            }
        }

        let log = self
            .private_log
            .as_ref()
            .expect("private log must be open while accepting prepares")
            .clone();
        match log.append(&mu) {
            Ok(offset) => mu.header.log_offset = offset,
            Err(e) => {
                self.ack_prepare(
                    ballot,
                    decree,
                    Some(ReplicationError::LogFailure("append failed".into())),
                );
                self.handle_local_failure(e);
                return Ok(());
            }
        }

        let mu = Arc::new(mu);
        self.prepare_list.prepare(mu.clone(), status)?;
        mu.set_logged();
        self.update_private_log_size_counter(&log);

        self.ack_prepare(ballot, decree, None);

        // Follow the primary's commit point as far as our window allows.
        let committed = self
            .prepare_list
            .commit(CommitType::CommitToDecreeSoft(committed_decree));
        for committed_mu in committed {
            self.execute_mutation(&committed_mu);
        }
        Ok(())
    }

    //                     //
    // Mutation execution  //
    //                     //

    /// Apply one committed mutation, honoring the status-specific rules.
    pub fn execute_mutation(
        &mut self,
        mu: &Arc<Mutation>,
    ) {
        debug!(
            "{}: execute mutation {}: request_count = {}",
            self.name,
            mu.name(),
            mu.client_requests.len()
        );

        let d = mu.header.decree;
        let mut apply_error: Option<Error> = None;
        let mut applied = false;

        match &self.role {
            RoleState::Inactive { .. } => {
                let app = self.app.as_ref().expect("app must be open");
                if app.last_committed_decree() + 1 == d {
                    apply_error = app.apply_mutation(mu).err();
                    applied = apply_error.is_none();
                } else {
                    info!(
                        "{}: mutation {} commit to {} skipped, app.last_committed_decree = {}",
                        self.name,
                        mu.name(),
                        self.status(),
                        app.last_committed_decree()
                    );
                }
            }
            RoleState::Primary(_) => {
                self.check_state_completeness();
                let app = self.app.as_ref().expect("app must be open");
                assert_eq!(
                    app.last_committed_decree() + 1,
                    d,
                    "app commit: {}, mutation decree: {}",
                    app.last_committed_decree(),
                    d
                );
                apply_error = app.apply_mutation(mu).err();
                applied = apply_error.is_none();
            }
            RoleState::Secondary(ss) => {
                if !ss.checkpoint_is_running {
                    self.check_state_completeness();
                    let app = self.app.as_ref().expect("app must be open");
                    assert_eq!(
                        app.last_committed_decree() + 1,
                        d,
                        "{} VS {}",
                        app.last_committed_decree() + 1,
                        d
                    );
                    apply_error = app.apply_mutation(mu).err();
                    applied = apply_error.is_none();
                } else {
                    info!(
                        "{}: mutation {} commit to {} skipped while checkpointing",
                        self.name,
                        mu.name(),
                        self.status()
                    );
                    // make sure private log saves the state;
                    // catch-up will be done later after checkpoint task is
                    // finished
                    assert!(self.private_log.is_some());
                }
            }
            RoleState::PotentialSecondary(ls) => match ls.learning_status {
                LearnerStatus::LearningSucceeded | LearnerStatus::LearningWithPrepareTransient => {
                    let app = self.app.as_ref().expect("app must be open");
                    assert_eq!(
                        app.last_committed_decree() + 1,
                        d,
                        "{} VS {}",
                        app.last_committed_decree() + 1,
                        d
                    );
                    apply_error = app.apply_mutation(mu).err();
                    applied = apply_error.is_none();
                }
                _ => {
                    info!(
                        "{}: mutation {} commit to {} skipped, learning_status = {:?}",
                        self.name,
                        mu.name(),
                        self.status(),
                        ls.learning_status
                    );
                    // prepare also happens with LearningWithPrepare; make
                    // sure the private log saves the state
                    assert!(self.private_log.is_some());
                }
            },
            RoleState::Split(ss) => {
                if ss.is_caught_up {
                    let app = self.app.as_ref().expect("app must be open");
                    assert_eq!(app.last_committed_decree() + 1, d);
                    apply_error = app.apply_mutation(mu).err();
                    applied = apply_error.is_none();
                }
            }
            RoleState::Error => {}
        }

        if self.verbose_commit_log() {
            info!("TwoPhaseCommit, {}: mutation {} committed", self.name, mu.name());
        }

        if applied {
            self.update_commit_qps(1);
        }

        if let Some(e) = apply_error {
            self.handle_local_failure(e);
        }

        if self.status() == PartitionStatus::Primary {
            // Responses go out only once the decree is committed.
            for request in &mu.client_requests {
                self.response_client_write(request, Ok(Bytes::new()));
            }

            let next = {
                let running = self.prepare_list.max_decree() - d;
                self.role
                    .as_primary_mut()
                    .expect("primary state must exist")
                    .write_queue
                    .check_possible_work(running)
            };
            if let Some(next_mu) = next {
                if let Err(e) = self.init_prepare(next_mu, false) {
                    error!("{}: pipelined init_prepare failed: {:?}", self.name, e);
                }
            }
        }

        // update table level latency counters for the primary partition
        if self.status() == PartitionStatus::Primary {
            let now = now_ns();
            for update in &mu.updates {
                if let Some(latency) = self.counters.table_level_latency(update.code) {
                    latency.observe((now - update.start_time_ns) as f64);
                }
            }
        }
    }

    //                       //
    // Lifecycle transitions //
    //                       //

    /// Apply a configuration decision from the meta service: a new status
    /// and ballot, optionally with a fresh membership view.
    pub fn update_local_configuration(
        &mut self,
        new_status: PartitionStatus,
        new_ballot: Ballot,
        membership: Option<ReplicaConfiguration>,
    ) -> Result<()> {
        if self.closed {
            return Err(ReplicationError::Closed.into());
        }

        if new_ballot < self.get_ballot() {
            return Err(ReplicationError::StaleBallot {
                request: new_ballot,
                current: self.get_ballot(),
            }
            .into());
        }

        let old_status = self.status();
        if old_status == new_status {
            // Same role under a newer ballot: a membership refresh.
            self.config.ballot = new_ballot;
            if let Some(m) = membership {
                self.apply_membership(m);
            }
            return Ok(());
        }

        if !RoleState::transition_allowed(old_status, new_status) {
            return Err(ReplicationError::InvalidTransition {
                from: old_status,
                to: new_status,
            }
            .into());
        }

        // A learner graduates only once learning succeeded.
        if old_status == PartitionStatus::PotentialSecondary
            && new_status == PartitionStatus::Secondary
        {
            let ls = self
                .role
                .as_potential_secondary()
                .expect("potential secondary state must exist");
            if ls.learning_status != LearnerStatus::LearningSucceeded {
                return Err(ReplicationError::InvalidState { status: old_status }.into());
            }
        }

        // Leaving primary abandons everything not yet committed.
        if old_status == PartitionStatus::Primary {
            self.cleanup_preparing_mutations(true);
        }
        let drained = self.role.cleanup();
        for mu in &drained {
            for request in &mu.client_requests {
                self.response_client_write(
                    request,
                    Err(ReplicationError::InvalidState { status: old_status }),
                );
            }
        }

        self.config.ballot = new_ballot;
        if let Some(m) = membership {
            self.apply_membership(m);
        }

        self.role = match new_status {
            PartitionStatus::Primary => RoleState::Primary(PrimaryState::new(
                self.config.clone(),
                self.max_prepared_decree(),
                self.options.staleness_for_commit,
                self.options.batch_write_disabled,
            )),
            PartitionStatus::Secondary => RoleState::Secondary(SecondaryState::default()),
            PartitionStatus::PotentialSecondary => {
                RoleState::PotentialSecondary(PotentialSecondaryState::new())
            }
            PartitionStatus::PartitionSplit => RoleState::Split(SplitState::default()),
            PartitionStatus::Inactive => RoleState::Inactive {
                transient: self.inactive_is_transient,
            },
            PartitionStatus::Error => RoleState::Error,
        };
        self.last_config_change_time_ms = now_ms();

        info!(
            "{}: status {} -> {} at ballot {}",
            self.name, old_status, new_status, new_ballot
        );
        Ok(())
    }

    /// A fatal local failure: the replica stops serving and reports itself.
    pub fn handle_local_failure(
        &mut self,
        err: Error,
    ) {
        error!(
            "{}: fatal local failure, transit to ERROR: {:?}",
            self.name, err
        );

        let old_status = self.status();
        let drained = self.role.cleanup();
        self.role = RoleState::Error;
        self.last_config_change_time_ms = now_ms();

        for mu in &drained {
            for request in &mu.client_requests {
                self.response_client_write(
                    request,
                    Err(ReplicationError::InvalidState { status: old_status }),
                );
            }
        }

        let verdict = err
            .replication_error()
            .cloned()
            .unwrap_or_else(|| ReplicationError::AppFailure(err.to_string()));
        self.host.on_replica_error(self.get_gpid(), verdict);
    }

    //                //
    // Close protocol //
    //                //

    /// Tear the replica down. The caller must have placed it in `ERROR` or
    /// `INACTIVE`, or the disk migrator must have reached `MOVED`.
    /// Idempotent.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        let migrator_done = self
            .disk_migrator
            .as_ref()
            .map(|m| m.status() >= DiskMigrationStatus::Moved)
            .unwrap_or(false);
        assert!(
            self.status() == PartitionStatus::Error
                || self.status() == PartitionStatus::Inactive
                || migrator_done,
            "invalid state (partition_status={}) when calling replica close",
            self.status()
        );

        let start_time = now_ms();

        if let Some(timer) = self.checkpoint_timer.take() {
            timer.cancel().await;
        }

        if let Some(app) = self.app.as_ref() {
            app.cancel_background_work(true);
        }

        self.tracker.cancel_outstanding_tasks().await;

        self.cleanup_preparing_mutations(true);

        if self.status() == PartitionStatus::Inactive {
            assert!(self.role.is_cleaned(), "role context is not cleared");
        } else {
            // For ERROR (or a migrated close) the cleanup is done here, as
            // the contexts may still hold resources.
            let drained = self.role.cleanup();
            for mu in &drained {
                for request in &mu.client_requests {
                    self.response_client_write(
                        request,
                        Err(ReplicationError::InvalidState {
                            status: self.status(),
                        }),
                    );
                }
            }
            assert!(self.role.is_cleaned(), "role context is not cleared");
        }

        if let Some(log) = self.private_log.take() {
            log.close();
        }

        if let Some(app) = self.app.take() {
            if let Err(e) = app.close(false) {
                warn!("{}: close app failed, err = {}", self.name, e);
            }
        }

        match self.disk_migrator.as_ref().map(|m| m.status()) {
            Some(DiskMigrationStatus::Moved) => {
                // MOVED -> CLOSED, flipping the replica directory over
                if let Some(migrator) = self.disk_migrator.as_mut() {
                    let new_dir = migrator.update_replica_dir();
                    self.dir = PathBuf::from(new_dir);
                }
            }
            Some(DiskMigrationStatus::Closed) => {
                self.disk_migrator = None;
            }
            _ => {}
        }

        // duplication may have ongoing tasks referencing the replica;
        // release it before the rest.
        if let Some(mut mgr) = self.duplication_mgr.take() {
            mgr.shutdown();
        }
        if let Some(mut mgr) = self.backup_mgr.take() {
            mgr.shutdown();
        }
        if let Some(mut loader) = self.bulk_loader.take() {
            loader.shutdown();
        }
        if let Some(mut mgr) = self.split_mgr.take() {
            mgr.shutdown();
        }

        self.counters.unregister();
        self.closed = true;

        info!(
            "{}: replica closed, time_used = {}ms",
            self.name,
            now_ms() - start_time
        );
        Ok(())
    }

    /// Abandon mutations still in the prepare pipeline beyond the commit
    /// point, answering their clients when this replica is primary.
    pub fn cleanup_preparing_mutations(
        &mut self,
        _wait: bool,
    ) {
        let committed = self.prepare_list.last_committed_decree();
        let dropped = self.prepare_list.truncate(committed);
        if dropped.is_empty() {
            return;
        }

        let status = self.status();
        debug!(
            "{}: abandoning {} preparing mutations above decree {}",
            self.name,
            dropped.len(),
            committed
        );
        if status == PartitionStatus::Primary {
            for mu in &dropped {
                for request in &mu.client_requests {
                    self.response_client_write(
                        request,
                        Err(ReplicationError::InvalidState { status }),
                    );
                }
            }
        }
    }

    //               //
    // Checkpointing //
    //               //

    /// Re-arm the randomized checkpoint schedule.
    pub fn update_last_checkpoint_generate_time(&mut self) {
        self.last_checkpoint_generate_time_ms = now_ms();
        let max_interval_ms = self.options.checkpoint_max_interval_hours * 3_600_000;
        // use random trigger time to avoid flush peek
        let jitter = rand::thread_rng().gen_range(max_interval_ms / 2..=max_interval_ms);
        self.next_checkpoint_interval_trigger_time_ms.store(
            self.last_checkpoint_generate_time_ms + jitter,
            Ordering::Release,
        );
    }

    pub fn last_checkpoint_generate_time_ms(&self) -> u64 {
        self.last_checkpoint_generate_time_ms
    }

    pub fn next_checkpoint_interval_trigger_time_ms(&self) -> u64 {
        self.next_checkpoint_interval_trigger_time_ms
            .load(Ordering::Acquire)
    }

    /// A checkpoint task started on this secondary; committed mutations are
    /// parked in the private log until it completes.
    pub fn begin_checkpoint(&mut self) -> Result<()> {
        let status = self.status();
        let Some(ss) = self.role.as_secondary_mut() else {
            return Err(ReplicationError::InvalidState { status }.into());
        };
        ss.checkpoint_is_running = true;
        Ok(())
    }

    /// The checkpoint task finished: resume applying and catch the app up
    /// with the decrees skipped while it ran.
    pub fn on_checkpoint_completed(&mut self) {
        if let Some(ss) = self.role.as_secondary_mut() {
            ss.checkpoint_is_running = false;
        }
        self.update_last_checkpoint_generate_time();
        self.catch_up_after_checkpoint();
    }

    fn catch_up_after_checkpoint(&mut self) {
        let mut apply_error: Option<Error> = None;
        {
            let Some(app) = self.app.as_ref() else {
                return;
            };
            let target = self.prepare_list.last_committed_decree();
            let mut d = app.last_committed_decree() + 1;
            while d <= target {
                match self.prepare_list.get_mutation_by_decree(d) {
                    Some(mu) => {
                        if let Err(e) = app.apply_mutation(&mu) {
                            apply_error = Some(e);
                            break;
                        }
                    }
                    None => {
                        // Evicted from the window; the host schedules a
                        // private log replay instead.
                        warn!(
                            "{}: decree {} no longer in prepare window, log replay required",
                            self.name, d
                        );
                        break;
                    }
                }
                d += 1;
            }
        }
        if let Some(e) = apply_error {
            self.handle_local_failure(e);
        }
    }

    //               //
    // Admin queries //
    //               //

    pub fn query_manual_compact_state(&self) -> Result<String> {
        let app = self
            .app
            .as_ref()
            .ok_or(ReplicationError::InvalidState {
                status: self.status(),
            })?;
        Ok(app.query_compact_state())
    }

    /// Parse the app's free-form compaction state string.
    ///
    /// The app reports one of:
    /// - `last finish at [-]`: never compacted
    /// - `last finish at [ts], last used {n} ms`: finished
    /// - `last finish at [-], recent enqueue at [ts]`: queued
    /// - `... recent enqueue at [ts], recent start at [ts]`: running
    pub fn get_manual_compact_status(&self) -> Result<ManualCompactionStatus> {
        let compact_state = self.query_manual_compact_state()?;
        let status = if compact_state.contains("recent start at") {
            ManualCompactionStatus::Running
        } else if compact_state.contains("recent enqueue at") {
            ManualCompactionStatus::Queuing
        } else if compact_state.contains("last used") {
            ManualCompactionStatus::Finished
        } else {
            ManualCompactionStatus::Idle
        };
        Ok(status)
    }

    pub fn query_data_version(&self) -> Result<u32> {
        let app = self
            .app
            .as_ref()
            .ok_or(ReplicationError::InvalidState {
                status: self.status(),
            })?;
        Ok(app.query_data_version())
    }

    pub fn on_detect_hotkey(
        &self,
        request: DetectHotkeyRequest,
    ) -> Result<DetectHotkeyResponse> {
        let app = self
            .app
            .as_ref()
            .ok_or(ReplicationError::InvalidState {
                status: self.status(),
            })?;
        Ok(app.on_detect_hotkey(request))
    }

    //                    //
    // Auxiliary controls //
    //                    //

    pub fn set_deny_client_write(
        &mut self,
        deny: bool,
    ) {
        self.deny_client_write = deny;
    }

    pub fn set_inactive_state_transient(
        &mut self,
        transient: bool,
    ) {
        self.inactive_is_transient = transient;
        if let RoleState::Inactive { transient: t } = &mut self.role {
            *t = transient;
        }
    }

    pub fn set_learner_status(
        &mut self,
        learning_status: LearnerStatus,
    ) -> Result<()> {
        let status = self.status();
        let Some(ls) = self.role.as_potential_secondary_mut() else {
            return Err(ReplicationError::InvalidState { status }.into());
        };
        ls.learning_status = learning_status;
        Ok(())
    }

    pub fn set_split_caught_up(
        &mut self,
        caught_up: bool,
    ) -> Result<()> {
        let status = self.status();
        let Some(ss) = self.role.as_split_mut() else {
            return Err(ReplicationError::InvalidState { status }.into());
        };
        ss.is_caught_up = caught_up;
        Ok(())
    }

    pub fn duplication_mgr(&self) -> Option<&DuplicationManager> {
        self.duplication_mgr.as_ref()
    }

    pub fn duplication_mgr_mut(&mut self) -> Option<&mut DuplicationManager> {
        self.duplication_mgr.as_mut()
    }

    pub fn backup_mgr(&self) -> Option<&BackupManager> {
        self.backup_mgr.as_ref()
    }

    pub fn bulk_loader(&self) -> Option<&BulkLoader> {
        self.bulk_loader.as_ref()
    }

    pub fn split_mgr(&self) -> Option<&SplitManager> {
        self.split_mgr.as_ref()
    }

    pub fn split_mgr_mut(&mut self) -> Option<&mut SplitManager> {
        self.split_mgr.as_mut()
    }

    pub fn disk_migrator(&self) -> Option<&DiskMigrator> {
        self.disk_migrator.as_ref()
    }

    pub fn disk_migrator_mut(&mut self) -> Option<&mut DiskMigrator> {
        self.disk_migrator.as_mut()
    }

    pub fn create_time_ms(&self) -> u64 {
        self.create_time_ms
    }

    pub fn last_config_change_time_ms(&self) -> u64 {
        self.last_config_change_time_ms
    }

    /// Persist the current `app_info` under the replica directory.
    pub fn save_app_info(&self) -> Result<()> {
        save_app_info(&self.dir, &self.app_info)
    }

    fn apply_membership(
        &mut self,
        m: ReplicaConfiguration,
    ) {
        self.config.primary = m.primary;
        self.config.secondaries = m.secondaries;
        self.config.learners = m.learners;
        if let Some(ps) = self.role.as_primary_mut() {
            ps.membership = self.config.clone();
        }
    }

    fn try_commit_ready(&mut self) {
        let committed = self.prepare_list.commit(CommitType::CommitAllReady);
        for mu in committed {
            self.execute_mutation(&mu);
        }
    }

    fn ack_prepare(
        &self,
        ballot: Ballot,
        decree: Decree,
        err: Option<ReplicationError>,
    ) {
        let primary = self.config.primary.clone().unwrap_or_default();
        self.host
            .send_prepare_ack(&primary, self.get_gpid(), ballot, decree, err);
    }

    fn update_private_log_size_counter(
        &self,
        log: &Arc<LOF<T>>,
    ) {
        self.counters
            .private_log_size_mb
            .set(log.total_size() as f64 / (1024.0 * 1024.0));
    }

    fn response_client_read(
        &self,
        request: &ClientRequest,
        result: std::result::Result<Bytes, ReplicationError>,
    ) {
        self.host
            .respond_client(self.get_gpid(), true, request, self.status(), result);
    }

    fn response_client_write(
        &self,
        request: &ClientRequest,
        result: std::result::Result<Bytes, ReplicationError>,
    ) {
        self.host
            .respond_client(self.get_gpid(), false, request, self.status(), result);
    }

    //-----------------------------------------------------------
    // Test hooks
    #[cfg(test)]
    pub(crate) fn set_role(
        &mut self,
        role: RoleState,
    ) {
        self.role = role;
    }

    #[cfg(test)]
    pub(crate) fn role_mut(&mut self) -> &mut RoleState {
        &mut self.role
    }

    #[cfg(test)]
    pub(crate) fn prepare_list_mut(&mut self) -> &mut PrepareList {
        &mut self.prepare_list
    }
}
