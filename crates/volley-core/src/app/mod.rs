//! Application services: validation, dispatch, pacing, status tracking,
//! queries, abort, and the probe workers.

pub mod abort;
pub mod dispatcher;
pub mod pacing;
pub mod query;
pub mod status;
pub mod validator;
pub mod worker_loop;

pub use abort::{AbortCoordinator, AbortReport};
pub use dispatcher::{BackendRegistry, DispatchError, DispatchReport, Dispatcher};
pub use pacing::{LoopState, PacingLoop, RunOutcome, StepOutcome, client_quota};
pub use query::{TaskQuery, fetch_regional_copies};
pub use status::StatusTracker;
pub use validator::{TaskValidator, ValidationError};
pub use worker_loop::WorkerGroup;
