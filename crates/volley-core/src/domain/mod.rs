//! Domain model (ids, task record, unit states, probe rows, errors).

pub mod errors;
pub mod ids;
pub mod probe;
pub mod state;
pub mod task;

pub use self::errors::VolleyError;
pub use self::ids::{ProbeId, Region, TaskId, UnitId};
pub use self::probe::{ProbeRecord, WorkItem};
pub use self::state::UnitState;
pub use self::task::{Compute, HttpMethod, Task, TaskKind, TaskSpec, TaskStatus};
