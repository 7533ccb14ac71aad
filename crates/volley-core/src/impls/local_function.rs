//! Function compute backend: one pacing-loop run per unit.

use std::sync::Arc;

use async_trait::async_trait;

use crate::app::pacing::LoopState;
use crate::domain::{Region, Task, UnitId};
use crate::ports::{BackendError, ComputeBackend, Stepper};

pub struct FunctionBackend {
    stepper: Arc<dyn Stepper>,
}

impl FunctionBackend {
    pub fn new(stepper: Arc<dyn Stepper>) -> Self {
        Self { stepper }
    }

    async fn start_run(
        &self,
        region: &Region,
        task: &Task,
        client: u32,
    ) -> Result<UnitId, BackendError> {
        let mode = if task.is_rate_mode() { "qps" } else { "n" };
        let name = format!("{mode}_{}_{}_{client}", task.name, task.task_id);
        let state = serde_json::to_value(LoopState::for_client(task, client))
            .map_err(|e| BackendError::CreateFailed(e.to_string()))?;
        self.stepper
            .start(region, &name, state)
            .await
            .map_err(|e| BackendError::CreateFailed(e.to_string()))
    }
}

#[async_trait]
impl ComputeBackend for FunctionBackend {
    async fn create_units(
        &self,
        region: &Region,
        task: &Task,
        count: u32,
        client_offset: u32,
    ) -> Result<Vec<UnitId>, BackendError> {
        // Rate mode runs one un-clientized loop; fixed-count mode runs one
        // loop per client, numbered from 1.
        if task.is_rate_mode() {
            let unit = self.start_run(region, task, 0).await?;
            return Ok(vec![unit]);
        }

        let mut units = Vec::with_capacity(count as usize);
        for i in 0..count {
            units.push(self.start_run(region, task, client_offset + i + 1).await?);
        }
        Ok(units)
    }

    async fn stop_unit(&self, _region: &Region, unit: &UnitId) -> Result<(), BackendError> {
        self.stepper
            .stop(unit)
            .await
            .map_err(|e| BackendError::StopFailed {
                unit: unit.clone(),
                message: e.to_string(),
            })
    }
}
