//! Stepper port - the resumable-stepper collaborator.
//!
//! Given a named run and an initial state document, the stepper repeatedly
//! invokes the pacing loop with the latest returned state until the loop
//! signals "ended"; a yield-and-resume must be indistinguishable from
//! uninterrupted execution to any observer. The state crosses this port as
//! JSON, exactly as it would cross a real resumable-execution service.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Region, UnitId};

#[derive(Debug, Error)]
pub enum StepperError {
    #[error("failed to start run: {0}")]
    StartFailed(String),

    #[error("unknown run {0}")]
    UnknownRun(UnitId),
}

#[async_trait]
pub trait Stepper: Send + Sync {
    /// Start a named run with its initial loop state; returns the run's
    /// unit id.
    async fn start(
        &self,
        region: &Region,
        name: &str,
        state: serde_json::Value,
    ) -> Result<UnitId, StepperError>;

    /// Has this run been externally stopped?
    async fn is_stopped(&self, unit: &UnitId) -> Result<bool, StepperError>;

    /// Force-stop a run. Stopping a finished or unknown run is harmless.
    async fn stop(&self, unit: &UnitId) -> Result<(), StepperError>;
}
