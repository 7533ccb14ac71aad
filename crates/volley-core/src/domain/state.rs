//! Execution unit state machine.

use serde::{Deserialize, Serialize};

/// State of one execution unit.
///
/// State transitions:
/// - Waiting -> Running -> Succeeded | Failed
/// - any non-terminal -> Stopped (abort)
///
/// Created at dispatch time as Waiting; mutated only by the status tracker
/// (backend notifications) or an explicit abort. Once terminal, immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitState {
    /// Dispatched, not yet started by the backend.
    Waiting,

    /// The backend reported the unit as started.
    Running,

    /// Finished its quota (or its time window) normally.
    Succeeded,

    /// The backend reported a failure.
    Failed,

    /// Terminated by an abort call.
    Stopped,
}

impl UnitState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            UnitState::Succeeded | UnitState::Failed | UnitState::Stopped
        )
    }

    /// Is this unit still live (needs a stop call on abort)?
    pub fn is_live(self) -> bool {
        !self.is_terminal()
    }
}
