//! Probe workers: pull work items off a topic, fire the probe, record
//! the result row when the task asked for a report.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::ports::{Prober, ReportSink, WorkSource};

/// How long one `next()` call blocks before the worker re-checks shutdown.
const POLL_TIMEOUT: Duration = Duration::from_millis(250);

/// Worker group handle.
/// - `request_shutdown()` stops the workers after their in-flight probe
/// - `shutdown_and_join()` waits for all of them to exit
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `n` workers draining `topic`.
    pub fn spawn(
        n: usize,
        source: Arc<dyn WorkSource>,
        topic: String,
        prober: Arc<dyn Prober>,
        reports: Arc<dyn ReportSink>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(n);
        for worker_id in 0..n {
            let source = Arc::clone(&source);
            let topic = topic.clone();
            let prober = Arc::clone(&prober);
            let reports = Arc::clone(&reports);
            let mut rx = shutdown_rx.clone();

            let join = tokio::spawn(async move {
                worker_loop(worker_id, source, topic, prober, reports, &mut rx).await;
            });
            joins.push(join);
        }

        Self { shutdown_tx, joins }
    }

    /// Request shutdown for all workers.
    /// In-flight probes finish; workers just stop taking new items.
    pub fn request_shutdown(&self) {
        // ignore send error: receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all workers.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for j in self.joins {
            let _ = j.await;
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    source: Arc<dyn WorkSource>,
    topic: String,
    prober: Arc<dyn Prober>,
    reports: Arc<dyn ReportSink>,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // next() blocks up to POLL_TIMEOUT, so race it against shutdown
        let item = tokio::select! {
            _ = shutdown_rx.changed() => {
                continue;
            }
            item = source.next(&topic, POLL_TIMEOUT) => item,
        };

        let Some(item) = item else {
            continue;
        };

        let record = prober.probe(&item).await;

        if item.report {
            if let Err(e) = reports.put_batch(vec![record]).await {
                warn!(worker_id, task_id = %item.task_id, error = %e, "report row write failed");
            }
        }
    }
}
