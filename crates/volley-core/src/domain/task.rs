//! Task record: the unit of a benchmark run.
//!
//! Design:
//! - `TaskSpec` is the raw creation request; the validator turns it into a
//!   normalized `Task` or rejects it with a specific violation.
//! - A multi-region task is stored as one `Task` record per region under the
//!   same `task_id`, differing only in `region` and `states`.
//! - `states` grows at dispatch time and is mutated only by the status
//!   tracker, one key at a time.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{Region, TaskId, UnitId};
use super::state::UnitState;

/// What kind of target the task benchmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskKind {
    Api,
    Html,
}

impl TaskKind {
    /// Parse the user-supplied kind, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "API" => Some(TaskKind::Api),
            "HTML" => Some(TaskKind::Html),
            _ => None,
        }
    }
}

/// HTTP method used by the probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            _ => None,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => "GET".fmt(f),
            HttpMethod::Post => "POST".fmt(f),
        }
    }
}

/// Compute backend family an execution unit runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compute {
    /// Managed-function runtime driving resumable pacing loops.
    Function,

    /// Virtual machines running a self-terminating boot script.
    Vm,

    /// Container tasks, `c` replicas of one definition.
    Container,

    /// Batch job with an array size of `c`.
    Batch,
}

/// Task-level status rollup over the per-unit `states` map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Running,
    Failed,
    Done,
}

impl TaskStatus {
    /// Recompute the rollup from the unit states.
    ///
    /// - every unit still Waiting (or no units yet): Pending
    /// - any unit live: Running
    /// - all terminal: Failed if any unit failed, Done otherwise
    pub fn rollup(states: &BTreeMap<UnitId, UnitState>) -> Self {
        if states.is_empty() || states.values().all(|s| *s == UnitState::Waiting) {
            return TaskStatus::Pending;
        }
        if states.values().any(|s| s.is_live()) {
            return TaskStatus::Running;
        }
        if states.values().any(|s| *s == UnitState::Failed) {
            TaskStatus::Failed
        } else {
            TaskStatus::Done
        }
    }
}

/// Raw task creation request, as received from the outer surface.
///
/// Everything is optional here; the validator decides what is required,
/// fills defaults and produces a `Task`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskSpec {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub url: Option<String>,
    pub method: Option<String>,
    pub compute: Option<Compute>,

    /// Total request count (fixed-count mode).
    pub n: Option<u64>,

    /// Requests per second (rate mode).
    pub qps: Option<u64>,

    /// Concurrency / client count.
    pub c: Option<u32>,

    pub timeout_ms: Option<u64>,
    pub success_code: Option<u16>,

    /// Shift of the default start time, in seconds from now.
    pub delay_seconds: Option<u64>,

    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,

    /// Target regions; empty means "the home region".
    #[serde(default)]
    pub regions: Vec<Region>,

    /// Persist individual probe results to the results store.
    #[serde(default)]
    pub report: bool,
}

/// A normalized, validated task record (one regional copy).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub name: String,
    pub kind: TaskKind,
    pub url: String,
    pub method: HttpMethod,
    pub compute: Compute,

    /// Exactly one of `n` / `qps` is set (validator invariant).
    pub n: Option<u64>,
    pub qps: Option<u64>,

    pub c: u32,

    /// `ceil(n / c)`, present whenever `n` is set.
    pub n_per_client: Option<u64>,

    pub timeout_ms: u64,
    pub success_code: u16,

    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,

    /// All regions of the run; every copy carries the full list so any one
    /// copy is enough to resolve the rest.
    pub regions: Vec<Region>,

    /// The region this copy lives in.
    pub region: Region,

    pub report: bool,

    /// Per-unit status map, keyed by backend-issued unit id.
    #[serde(default)]
    pub states: BTreeMap<UnitId, UnitState>,

    pub status: TaskStatus,

    /// Set once at creation, immutable afterwards.
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Rate mode (`qps` set) as opposed to fixed-count mode (`n` set).
    pub fn is_rate_mode(&self) -> bool {
        self.qps.is_some()
    }

    /// Unit ids that are not yet in a terminal state.
    pub fn live_units(&self) -> Vec<UnitId> {
        self.states
            .iter()
            .filter(|(_, s)| s.is_live())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Recompute the task-level rollup from `states`.
    pub fn rollup(&self) -> TaskStatus {
        TaskStatus::rollup(&self.states)
    }
}
