//! Concrete adapters behind the ports: in-memory stores and channels for
//! local runs and tests, the local stepper that drives pacing loops as
//! tokio tasks, and the reqwest-backed prober.

pub mod http_prober;
pub mod inmem_fanout;
pub mod inmem_report;
pub mod inmem_store;
pub mod local_function;
pub mod local_stepper;
pub mod static_regions;

pub use http_prober::HttpProber;
pub use inmem_fanout::InMemoryFanout;
pub use inmem_report::InMemoryReportSink;
pub use inmem_store::InMemoryTaskStore;
pub use local_function::FunctionBackend;
pub use local_stepper::{LocalStepper, UnitEvent};
pub use static_regions::StaticRegionOracle;
