//! Status tracker: applies asynchronous backend notifications to the
//! owning task's per-unit states map.
//!
//! Delivery is at-least-once and races with task deletion, so everything
//! here is a no-op or a logged-and-swallowed failure, never an error to
//! the caller; applying the same terminal notification twice is harmless.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{Region, TaskId, UnitId, UnitState};
use crate::ports::TaskStore;

pub struct StatusTracker {
    store: Arc<dyn TaskStore>,
}

impl StatusTracker {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// Apply one notification: unit id + newly reported state.
    ///
    /// - task not found: no-op (deleted under us, expected)
    /// - unit not in `states`: no-op (stale or foreign notification)
    /// - otherwise: targeted write of that one key, then the task-level
    ///   rollup
    pub async fn apply(&self, region: &Region, task_id: TaskId, unit: &UnitId, state: UnitState) {
        let task = match self.store.get(region, task_id).await {
            Ok(Some(task)) => task,
            Ok(None) => {
                debug!(%task_id, %unit, "notification for a missing task, ignoring");
                return;
            }
            Err(e) => {
                warn!(%task_id, %unit, error = %e, "status read failed, dropping notification");
                return;
            }
        };

        if !task.states.contains_key(unit) {
            debug!(%task_id, %unit, "notification for an unknown unit, ignoring");
            return;
        }

        match self.store.update_unit_state(region, task_id, unit, state).await {
            Ok(true) => {}
            Ok(false) => return, // deleted between read and write
            Err(e) => {
                warn!(%task_id, %unit, error = %e, "unit state update failed, delivery will retry");
                return;
            }
        }

        // Roll up from a fresh read so concurrent updates of other units
        // are included.
        match self.store.get(region, task_id).await {
            Ok(Some(task)) => {
                let status = task.rollup();
                if let Err(e) = self.store.update_status(region, task_id, status).await {
                    warn!(%task_id, error = %e, "status rollup update failed");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(%task_id, error = %e, "status rollup read failed"),
        }
    }
}
