use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::warn;

/// Owner of a replica's outstanding async tasks.
///
/// Every long-running task spawned on behalf of one replica registers its
/// handle here and watches the shutdown signal. `cancel_outstanding_tasks`
/// is the synchronous teardown point of the close protocol: it signals and
/// then waits for every task to observe cancellation and exit.
pub struct TaskTracker {
    shutdown_tx: watch::Sender<()>,
    shutdown_rx: watch::Receiver<()>,
    handles: Vec<JoinHandle<()>>,
}

impl TaskTracker {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        Self {
            shutdown_tx,
            shutdown_rx,
            handles: Vec::new(),
        }
    }

    /// Shutdown signal for a task about to be spawned.
    pub fn shutdown_signal(&self) -> watch::Receiver<()> {
        self.shutdown_rx.clone()
    }

    pub fn track(
        &mut self,
        handle: JoinHandle<()>,
    ) {
        self.handles.push(handle);
    }

    pub fn outstanding_count(&self) -> usize {
        self.handles.len()
    }

    /// Signal cancellation and wait for every tracked task to exit.
    pub async fn cancel_outstanding_tasks(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        debug!("cancelling {} outstanding tasks", self.handles.len());

        let _ = self.shutdown_tx.send(());

        for result in join_all(self.handles.drain(..)).await {
            if let Err(e) = result {
                warn!("tracked task exited abnormally: {:?}", e);
            }
        }
    }
}

impl Default for TaskTracker {
    fn default() -> Self {
        Self::new()
    }
}
