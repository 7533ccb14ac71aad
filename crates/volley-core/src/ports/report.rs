//! ReportSink port - the per-probe results store.

use async_trait::async_trait;

use crate::domain::ProbeRecord;
use crate::ports::task_store::StoreError;

/// Persists probe result rows, written only for tasks with `report` set.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Persist a batch of rows. An empty batch is a no-op.
    async fn put_batch(&self, rows: Vec<ProbeRecord>) -> Result<(), StoreError>;
}
