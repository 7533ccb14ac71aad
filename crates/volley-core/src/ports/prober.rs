//! Prober port - issues exactly one HTTP probe.

use async_trait::async_trait;

use crate::domain::{ProbeRecord, WorkItem};

/// Executes one probe and classifies the outcome.
///
/// Infallible by contract: a transport error (timeout, DNS failure,
/// connection refused) is caught and classified as a failure row; it never
/// propagates as an error to the caller.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, item: &WorkItem) -> ProbeRecord;
}
