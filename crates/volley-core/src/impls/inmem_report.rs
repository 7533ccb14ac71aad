//! In-memory report sink, mostly for local runs and tests.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::ProbeRecord;
use crate::ports::{ReportSink, StoreError};

#[derive(Default)]
pub struct InMemoryReportSink {
    rows: Mutex<Vec<ProbeRecord>>,
}

impl InMemoryReportSink {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
        }
    }

    pub async fn rows(&self) -> Vec<ProbeRecord> {
        self.rows.lock().await.clone()
    }
}

#[async_trait]
impl ReportSink for InMemoryReportSink {
    async fn put_batch(&self, records: Vec<ProbeRecord>) -> Result<(), StoreError> {
        self.rows.lock().await.extend(records);
        Ok(())
    }
}
