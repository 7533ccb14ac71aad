//! volley-core
//!
//! Core building blocks for the Volley load-generation orchestrator.
//!
//! # Module layout
//! - **domain**: domain model (ids, task record, unit states, probe rows, errors)
//! - **ports**: abstraction layer (TaskStore, FanoutChannel, ComputeBackend,
//!   Stepper, Prober, ReportSink, RegionOracle, Clock, IdGenerator)
//! - **app**: application logic (validator, dispatcher, pacing loop,
//!   worker loop, status tracker, abort coordinator, queries)
//! - **impls**: in-process implementations (in-memory store/fan-out,
//!   local stepper, function backend, HTTP prober)

pub mod domain;
pub mod ports;
pub mod app;
pub mod impls;
