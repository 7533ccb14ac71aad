//! Local stepper: drives pacing loops as in-process tokio tasks.
//!
//! Each started run gets its own driver task that re-invokes the pacing
//! loop whenever it yields, so a yield-and-resume looks exactly like one
//! uninterrupted execution. Lifecycle transitions are emitted as
//! `UnitEvent`s; the host pumps those into the status tracker.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::warn;

use crate::app::pacing::{LoopState, PacingLoop, RunOutcome};
use crate::domain::{Region, TaskId, UnitId, UnitState};
use crate::ports::{Stepper, StepperError};

/// One unit lifecycle transition, addressed to the owning task copy.
#[derive(Debug, Clone)]
pub struct UnitEvent {
    pub region: Region,
    pub task_id: TaskId,
    pub unit: UnitId,
    pub state: UnitState,
}

struct RunHandle {
    stop_tx: watch::Sender<bool>,
}

pub struct LocalStepper {
    pacing: Arc<PacingLoop>,
    events: mpsc::UnboundedSender<UnitEvent>,
    runs: Mutex<HashMap<UnitId, RunHandle>>,
}

impl LocalStepper {
    pub fn new(pacing: Arc<PacingLoop>, events: mpsc::UnboundedSender<UnitEvent>) -> Self {
        Self {
            pacing,
            events,
            runs: Mutex::new(HashMap::new()),
        }
    }

    fn emit(&self, region: &Region, task_id: TaskId, unit: &UnitId, state: UnitState) {
        // receiver gone means the host is shutting down
        let _ = self.events.send(UnitEvent {
            region: region.clone(),
            task_id,
            unit: unit.clone(),
            state,
        });
    }
}

#[async_trait]
impl Stepper for LocalStepper {
    async fn start(
        &self,
        region: &Region,
        name: &str,
        state: serde_json::Value,
    ) -> Result<UnitId, StepperError> {
        let state: LoopState =
            serde_json::from_value(state).map_err(|e| StepperError::StartFailed(e.to_string()))?;

        let unit = UnitId::new(name);
        let (stop_tx, stop_rx) = watch::channel(false);
        self.runs
            .lock()
            .await
            .insert(unit.clone(), RunHandle { stop_tx });

        self.emit(region, state.task.task_id, &unit, UnitState::Running);

        let pacing = Arc::clone(&self.pacing);
        let events = self.events.clone();
        let region = region.clone();
        let unit_for_task = unit.clone();
        tokio::spawn(async move {
            let task_id = state.task.task_id;
            let mut state = state;
            let terminal = loop {
                match pacing.run(state, &stop_rx).await {
                    Ok(RunOutcome::Yield(next)) => state = next,
                    Ok(RunOutcome::Ended) => {
                        break if *stop_rx.borrow() {
                            UnitState::Stopped
                        } else {
                            UnitState::Succeeded
                        };
                    }
                    Err(e) => {
                        warn!(%task_id, unit = %unit_for_task, error = %e, "pacing run failed");
                        break UnitState::Failed;
                    }
                }
            };
            let _ = events.send(UnitEvent {
                region,
                task_id,
                unit: unit_for_task,
                state: terminal,
            });
        });

        Ok(unit)
    }

    async fn is_stopped(&self, unit: &UnitId) -> Result<bool, StepperError> {
        let runs = self.runs.lock().await;
        let handle = runs.get(unit).ok_or_else(|| StepperError::UnknownRun(unit.clone()))?;
        Ok(*handle.stop_tx.borrow())
    }

    async fn stop(&self, unit: &UnitId) -> Result<(), StepperError> {
        let runs = self.runs.lock().await;
        if let Some(handle) = runs.get(unit) {
            // ignore send error: the driver may already have exited
            let _ = handle.stop_tx.send(true);
        }
        Ok(())
    }
}
