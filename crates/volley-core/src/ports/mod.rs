//! Ports - abstraction layer.
//!
//! Each trait here is the interface to a collaborator the core does not
//! own: the task store, the fan-out channel, the compute backends, the
//! resumable stepper, the region oracle, the results store, and the
//! clock / id-generator seams that keep timing and ids testable.

pub mod clock;
pub mod compute;
pub mod fanout;
pub mod id_generator;
pub mod prober;
pub mod regions;
pub mod report;
pub mod stepper;
pub mod task_store;

pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::compute::{BackendError, ComputeBackend};
pub use self::fanout::{FanoutChannel, FanoutError, WorkSource};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::prober::Prober;
pub use self::regions::RegionOracle;
pub use self::report::ReportSink;
pub use self::stepper::{Stepper, StepperError};
pub use self::task_store::{StoreError, TaskStore};
