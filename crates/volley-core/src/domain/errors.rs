//! Crate-level error type.

use thiserror::Error;

use super::ids::TaskId;

/// Aggregate error for application-level operations.
///
/// Port-specific errors (`StoreError`, `BackendError`, ...) live next to
/// their port traits and convert into this type at the app boundary.
#[derive(Debug, Error)]
pub enum VolleyError {
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    #[error("store error: {0}")]
    Store(String),

    #[error("{0}")]
    Other(String),
}
