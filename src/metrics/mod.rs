
use std::collections::HashMap;
use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::exponential_buckets;
use prometheus::Gauge;
use prometheus::GaugeVec;
use prometheus::Histogram;
use prometheus::HistogramOpts;
use prometheus::HistogramVec;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;

use crate::storage_rpc_req_codes;
use crate::Gpid;
use crate::RpcCode;

lazy_static! {
    pub static ref PRIVATE_LOG_SIZE_MB: GaugeVec = GaugeVec::new(
        Opts::new("replica_private_log_size_mb", "Private log size in MB"),
        &["gpid"]
    )
    .expect("metric can not be created");
    pub static ref RECENT_READ_THROTTLING_DELAY_COUNT: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "replica_recent_read_throttling_delay_total",
            "Recent read throttling delay count"
        ),
        &["gpid"]
    )
    .expect("metric can not be created");
    pub static ref RECENT_READ_THROTTLING_REJECT_COUNT: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "replica_recent_read_throttling_reject_total",
            "Recent read throttling reject count"
        ),
        &["gpid"]
    )
    .expect("metric can not be created");
    pub static ref RECENT_WRITE_THROTTLING_DELAY_COUNT: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "replica_recent_write_throttling_delay_total",
            "Recent write throttling delay count"
        ),
        &["gpid"]
    )
    .expect("metric can not be created");
    pub static ref RECENT_WRITE_THROTTLING_REJECT_COUNT: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "replica_recent_write_throttling_reject_total",
            "Recent write throttling reject count"
        ),
        &["gpid"]
    )
    .expect("metric can not be created");
    pub static ref DUP_DISABLED_NON_IDEMPOTENT_WRITE_COUNT: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "replica_dup_disabled_non_idempotent_write_total",
            "Non-idempotent writes rejected while duplication is enabled"
        ),
        &["table"]
    )
    .expect("metric can not be created");
    pub static ref BACKUP_REQUEST_QPS: IntCounterVec = IntCounterVec::new(
        Opts::new("replica_backup_request_total", "Backup requests served"),
        &["table"]
    )
    .expect("metric can not be created");
    pub static ref TABLE_LEVEL_LATENCY: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "table_level_latency_ns",
            "Storage RPC latency in nanoseconds, per table"
        )
        .buckets(exponential_buckets(1000.0, 4.0, 12).unwrap()),
        &["code", "table"]
    )
    .expect("metric can not be created");
    pub static ref REPLICA_COMMIT_QPS: IntCounter = IntCounter::new(
        "replica_commit_total",
        "Mutations committed across all replicas"
    )
    .expect("metric can not be created");
    pub static ref CUSTOM_REGISTRY: Registry =
        Registry::new_custom(Some("replica_core".to_string()), None).unwrap();
}

static REGISTER: Once = Once::new();

/// Register the crate's collectors with the custom registry. Idempotent;
/// the host calls this once at process init, tests call it freely.
pub fn init_metrics() {
    REGISTER.call_once(|| register_custom_metrics(&CUSTOM_REGISTRY));
}

pub(crate) fn register_custom_metrics(registry: &Registry) {
    registry
        .register(Box::new(PRIVATE_LOG_SIZE_MB.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(RECENT_READ_THROTTLING_DELAY_COUNT.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(RECENT_READ_THROTTLING_REJECT_COUNT.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(RECENT_WRITE_THROTTLING_DELAY_COUNT.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(RECENT_WRITE_THROTTLING_REJECT_COUNT.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(DUP_DISABLED_NON_IDEMPOTENT_WRITE_COUNT.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(BACKUP_REQUEST_QPS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(TABLE_LEVEL_LATENCY.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(REPLICA_COMMIT_QPS.clone()))
        .expect("collector can be registered");
}

/// Per-replica counter bundle.
///
/// Resolves the label handles once at replica construction and drops the
/// gpid-scoped series again at close. Table-scoped series (latency
/// percentiles, backup QPS) are shared by every replica of the same table
/// and survive individual replica closes.
pub struct ReplicaCounters {
    gpid_label: String,

    pub private_log_size_mb: Gauge,
    pub recent_read_throttling_delay_count: IntCounter,
    pub recent_read_throttling_reject_count: IntCounter,
    pub recent_write_throttling_delay_count: IntCounter,
    pub recent_write_throttling_reject_count: IntCounter,
    pub dup_disabled_non_idempotent_write_count: IntCounter,
    pub backup_request_qps: IntCounter,

    table_level_latency: HashMap<RpcCode, Histogram>,
}

impl ReplicaCounters {
    pub fn register(
        gpid: Gpid,
        app_name: &str,
    ) -> Self {
        init_metrics();

        let gpid_label = gpid.to_string();

        // Replicas serving the same table share one latency series per code.
        let mut table_level_latency = HashMap::new();
        for code in storage_rpc_req_codes() {
            table_level_latency.insert(
                *code,
                TABLE_LEVEL_LATENCY.with_label_values(&[code.as_str(), app_name]),
            );
        }

        Self {
            private_log_size_mb: PRIVATE_LOG_SIZE_MB.with_label_values(&[&gpid_label]),
            recent_read_throttling_delay_count: RECENT_READ_THROTTLING_DELAY_COUNT
                .with_label_values(&[&gpid_label]),
            recent_read_throttling_reject_count: RECENT_READ_THROTTLING_REJECT_COUNT
                .with_label_values(&[&gpid_label]),
            recent_write_throttling_delay_count: RECENT_WRITE_THROTTLING_DELAY_COUNT
                .with_label_values(&[&gpid_label]),
            recent_write_throttling_reject_count: RECENT_WRITE_THROTTLING_REJECT_COUNT
                .with_label_values(&[&gpid_label]),
            dup_disabled_non_idempotent_write_count: DUP_DISABLED_NON_IDEMPOTENT_WRITE_COUNT
                .with_label_values(&[app_name]),
            backup_request_qps: BACKUP_REQUEST_QPS.with_label_values(&[app_name]),
            table_level_latency,
            gpid_label,
        }
    }

    /// The table-level latency series for `code`, if it is a storage RPC.
    pub fn table_level_latency(
        &self,
        code: RpcCode,
    ) -> Option<&Histogram> {
        self.table_level_latency.get(&code)
    }

    /// Drop the gpid-scoped series of this replica.
    pub fn unregister(&self) {
        let labels = &[self.gpid_label.as_str()];
        let _ = PRIVATE_LOG_SIZE_MB.remove_label_values(labels);
        let _ = RECENT_READ_THROTTLING_DELAY_COUNT.remove_label_values(labels);
        let _ = RECENT_READ_THROTTLING_REJECT_COUNT.remove_label_values(labels);
        let _ = RECENT_WRITE_THROTTLING_DELAY_COUNT.remove_label_values(labels);
        let _ = RECENT_WRITE_THROTTLING_REJECT_COUNT.remove_label_values(labels);
    }
}
