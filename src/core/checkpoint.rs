//! The per-replica checkpoint interval timer.
//!
//! A background task wakes periodically and, once the wall clock passes the
//! randomized trigger point, notifies the host that this replica wants a
//! checkpoint. The trigger point lives in a shared atomic so the replica can
//! re-arm it after each checkpoint without touching the task.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::warn;

use crate::alias::HOF;
use crate::constants::CHECKPOINT_TIMER_TICK_MS;
use crate::utils::time::now_ms;
use crate::Gpid;
use crate::ReplicaHost;
use crate::TypeConfig;

/// Sentinel meaning "fired, waiting for the replica to re-arm".
pub(crate) const TRIGGER_DISARMED: u64 = u64::MAX;

pub(crate) struct CheckpointTimer {
    shutdown_tx: watch::Sender<()>,
    handle: JoinHandle<()>,
}

impl CheckpointTimer {
    pub(crate) fn spawn<T: TypeConfig>(
        gpid: Gpid,
        host: Arc<HOF<T>>,
        next_trigger_time_ms: Arc<AtomicU64>,
    ) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(());

        let handle = tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_millis(CHECKPOINT_TIMER_TICK_MS));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        debug!("[{}] checkpoint timer cancelled", gpid);
                        return;
                    }
                    _ = interval.tick() => {
                        let trigger = next_trigger_time_ms.load(Ordering::Acquire);
                        if trigger != TRIGGER_DISARMED && now_ms() >= trigger {
                            debug!("[{}] checkpoint interval elapsed", gpid);
                            // Disarm until the replica re-arms after the
                            // checkpoint completes.
                            next_trigger_time_ms.store(TRIGGER_DISARMED, Ordering::Release);
                            host.trigger_checkpoint(gpid);
                        }
                    }
                }
            }
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Cancel with wait: returns only after the timer task exited.
    pub(crate) async fn cancel(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.handle.await {
            warn!("checkpoint timer task exited abnormally: {:?}", e);
        }
    }
}
