//! Probe work items and result rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ProbeId, TaskId};
use super::task::{HttpMethod, Task};

/// One unit of probe work handed to the worker fan-out channel.
///
/// Carries everything a worker needs to issue exactly one request and
/// classify the outcome; items published by a rate-mode burst are already
/// paced and are never paced again downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub task_id: TaskId,
    pub url: String,
    pub method: HttpMethod,
    pub timeout_ms: u64,
    pub success_code: u16,

    /// Client number the item was issued for (0 for un-clientized bursts).
    pub client: u32,

    /// Persist the result row for this probe.
    pub report: bool,
}

impl WorkItem {
    /// Build a work item from a task snapshot for the given client number.
    pub fn from_task(task: &Task, client: u32) -> Self {
        Self {
            task_id: task.task_id,
            url: task.url.clone(),
            method: task.method,
            timeout_ms: task.timeout_ms,
            success_code: task.success_code,
            client,
            report: task.report,
        }
    }
}

/// One persisted probe result row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeRecord {
    pub id: ProbeId,
    pub task_id: TaskId,
    pub url: String,

    /// Response status equalled the task's `success_code`.
    pub success: bool,

    /// Transport error message, empty on success.
    pub message: String,

    /// Wall-clock latency in milliseconds.
    pub ms: u64,

    pub time: DateTime<Utc>,
}
