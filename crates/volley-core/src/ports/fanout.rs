//! Fan-out channel port - hands probe work items to the workers.
//!
//! At-least-once delivery, no ordering guarantee. The publishing side is
//! the only contract the pacing loop depends on; `WorkSource` is the
//! consuming side the in-process worker group pulls from.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::WorkItem;

#[derive(Debug, Error)]
pub enum FanoutError {
    #[error("publish failed: {0}")]
    PublishFailed(String),
}

#[async_trait]
pub trait FanoutChannel: Send + Sync {
    /// Publish a batch of work items to a topic.
    ///
    /// An empty batch is a no-op, not an error.
    async fn publish_batch(&self, topic: &str, items: Vec<WorkItem>) -> Result<(), FanoutError>;
}

#[async_trait]
pub trait WorkSource: Send + Sync {
    /// Pop the next work item, waiting up to `timeout`.
    async fn next(&self, topic: &str, timeout: Duration) -> Option<WorkItem>;
}
