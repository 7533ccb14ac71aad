//! ComputeBackend port - one implementation per `Compute` variant.
//!
//! The dispatcher and the abort coordinator depend only on this trait and
//! select the variant from the task's `compute` field; nothing downstream
//! branches on backend identity.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Region, Task, UnitId};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("unit creation failed: {0}")]
    CreateFailed(String),

    #[error("stop failed for unit {unit}: {message}")]
    StopFailed { unit: UnitId, message: String },

    #[error("no backend registered for this compute kind")]
    NotRegistered,
}

#[async_trait]
pub trait ComputeBackend: Send + Sync {
    /// Create `count` execution units for the task in one region.
    ///
    /// The task snapshot carries everything a unit needs to know its
    /// identity and quota (url, window, `n_per_client` or `qps`); how it
    /// is embedded (loop state, boot script, container environment, job
    /// parameters) is the backend's business. `client_offset` numbers the
    /// units' clients, starting at `client_offset + 1`.
    async fn create_units(
        &self,
        region: &Region,
        task: &Task,
        count: u32,
        client_offset: u32,
    ) -> Result<Vec<UnitId>, BackendError>;

    /// Request termination of one unit. Cooperative: a stop call is a
    /// request, not a guarantee of immediate cessation. Stopping an
    /// already-terminal or unknown unit fails harmlessly.
    async fn stop_unit(&self, region: &Region, unit: &UnitId) -> Result<(), BackendError>;
}
