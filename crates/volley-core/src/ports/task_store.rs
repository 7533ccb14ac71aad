//! TaskStore port - the per-region task record store.
//!
//! One record per task per region; no cross-region transactionality is
//! assumed. `update_unit_state` is the only write the status tracker uses:
//! it must touch a single key of the `states` map (plus `updated` metadata
//! the implementation keeps), so concurrent notifications for different
//! units never clobber each other.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Region, Task, TaskId, TaskStatus, UnitId, UnitState, VolleyError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store operation failed: {0}")]
    OperationFailed(String),
}

impl From<StoreError> for VolleyError {
    fn from(e: StoreError) -> Self {
        VolleyError::Store(e.to_string())
    }
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Fetch one regional copy. `Ok(None)` when the task does not exist.
    async fn get(&self, region: &Region, task_id: TaskId) -> Result<Option<Task>, StoreError>;

    /// Persist a regional copy (whole record, creation time only).
    async fn put(&self, task: Task) -> Result<(), StoreError>;

    /// Targeted, conditional write of one `states` entry.
    ///
    /// Returns `Ok(false)` when the task or the unit key is absent; the
    /// caller treats that as a no-op, never as an error.
    async fn update_unit_state(
        &self,
        region: &Region,
        task_id: TaskId,
        unit: &UnitId,
        state: UnitState,
    ) -> Result<bool, StoreError>;

    /// Targeted write of the task-level status rollup.
    async fn update_status(
        &self,
        region: &Region,
        task_id: TaskId,
        status: TaskStatus,
    ) -> Result<(), StoreError>;

    /// Delete one regional copy. Deleting a missing record is not an error.
    async fn delete(&self, region: &Region, task_id: TaskId) -> Result<(), StoreError>;

    /// All task records in one region.
    async fn scan(&self, region: &Region) -> Result<Vec<Task>, StoreError>;
}
