//! Pacing loop: the resumable control loop that paces request bursts to
//! wall-clock seconds.
//!
//! The loop is cooperative and externally resumable: `step` performs one
//! state-machine transition (AwaitingStart / Bursting / Ended) and `run`
//! drives steps inside a single invocation, yielding its state back to the
//! stepper when the invocation's wall-clock budget is nearly spent. A
//! yield-and-resume is indistinguishable from uninterrupted execution: no
//! burst wave is duplicated or skipped.
//!
//! Modes:
//! - fixed-count, single client: enqueue all `n` items at once, end.
//! - fixed-count, multi client: each loop instance probes its own quota
//!   back-to-back, one probe per step, no inter-request delay.
//! - rate mode: one burst of `qps` items per wall-clock second, aligned to
//!   second boundaries.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::domain::{Task, VolleyError, WorkItem};
use crate::ports::{Clock, FanoutChannel, Prober, ReportSink};

/// How often the loop polls the external stop flag, in iterations.
const STOP_POLL_INTERVAL: u32 = 5;

/// The loop yields when this close to the invocation budget.
const YIELD_MARGIN: Duration = Duration::from_secs(2);

/// Default wall-clock ceiling of one invocation.
pub const DEFAULT_INVOCATION_BUDGET: Duration = Duration::from_secs(900);

/// State carried across invocations; serializable so it can cross the
/// stepper port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopState {
    pub task: Task,

    /// Client number this loop instance runs as (1-based; 0 for the single
    /// rate-mode / single-client instance).
    pub client: u32,

    /// Remaining probes, fixed-count multi-client mode only.
    pub remaining: Option<u64>,
}

impl LoopState {
    /// Initial state for one client of a task.
    pub fn for_client(task: &Task, client: u32) -> Self {
        let remaining = match task.n {
            Some(n) if task.c > 1 => Some(client_quota(n, task.c, client)),
            _ => None,
        };
        Self {
            task: task.clone(),
            client,
            remaining,
        }
    }
}

/// Outcome of one `step` call.
#[derive(Debug)]
pub enum StepOutcome {
    /// Not done; invoke again with this state.
    Continue(LoopState),

    /// The loop reached its end (time window passed, quota exhausted, or
    /// all work enqueued).
    Ended,
}

/// Outcome of one `run` invocation.
#[derive(Debug)]
pub enum RunOutcome {
    /// Invocation budget nearly spent; resume with this state.
    Yield(LoopState),

    Ended,
}

/// Requests client `client` (1-based) is responsible for.
///
/// Quotas differ by at most one and sum to exactly `n`; the first `n % c`
/// clients carry the rounding remainder.
pub fn client_quota(n: u64, c: u32, client: u32) -> u64 {
    let c = u64::from(c);
    let base = n / c;
    if u64::from(client) <= n % c { base + 1 } else { base }
}

pub struct PacingLoop {
    clock: Arc<dyn Clock>,
    fanout: Arc<dyn FanoutChannel>,
    prober: Arc<dyn Prober>,
    reports: Arc<dyn ReportSink>,
    topic: String,
    invocation_budget: Duration,
}

impl PacingLoop {
    pub fn new(
        clock: Arc<dyn Clock>,
        fanout: Arc<dyn FanoutChannel>,
        prober: Arc<dyn Prober>,
        reports: Arc<dyn ReportSink>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            clock,
            fanout,
            prober,
            reports,
            topic: topic.into(),
            invocation_budget: DEFAULT_INVOCATION_BUDGET,
        }
    }

    /// Override the invocation wall-clock budget (host execution ceiling).
    pub fn with_invocation_budget(mut self, budget: Duration) -> Self {
        self.invocation_budget = budget;
        self
    }

    /// One state-machine transition.
    pub async fn step(&self, state: LoopState) -> Result<StepOutcome, VolleyError> {
        let task = &state.task;
        let now = self.clock.now();

        // AwaitingStart: burn time until the window opens, one second
        // boundary at a time, so the first burst lands on a boundary.
        if now < task.start_time {
            self.sleep_to_second_boundary().await;
            return Ok(StepOutcome::Continue(state));
        }

        if now >= task.end_time {
            return Ok(StepOutcome::Ended);
        }

        if let Some(qps) = task.qps {
            // Rate mode: one wave of `qps` items, then realign to the next
            // second boundary. Items are already paced; workers fire them
            // as they arrive, with no internal concurrency cap.
            let items = (0..qps)
                .map(|_| WorkItem::from_task(task, state.client))
                .collect();
            self.fanout
                .publish_batch(&self.topic, items)
                .await
                .map_err(|e| VolleyError::Other(e.to_string()))?;
            self.sleep_to_second_boundary().await;
            return Ok(StepOutcome::Continue(state));
        }

        if task.c == 1 {
            // Fixed-count, single client: everything at once, no pacing.
            let n = task.n.unwrap_or(0);
            let items = (0..n)
                .map(|_| WorkItem::from_task(task, state.client))
                .collect();
            self.fanout
                .publish_batch(&self.topic, items)
                .await
                .map_err(|e| VolleyError::Other(e.to_string()))?;
            return Ok(StepOutcome::Ended);
        }

        // Fixed-count, multi client: one probe per step, back-to-back.
        let record = self.prober.probe(&WorkItem::from_task(task, state.client)).await;
        if task.report {
            self.reports.put_batch(vec![record]).await?;
        }

        let remaining = state.remaining.unwrap_or(1).saturating_sub(1);
        if remaining == 0 {
            return Ok(StepOutcome::Ended);
        }
        Ok(StepOutcome::Continue(LoopState {
            remaining: Some(remaining),
            ..state
        }))
    }

    /// Drive steps within one invocation.
    ///
    /// Polls `stop` every few iterations and terminates early when the run
    /// was externally stopped; yields with the current state when wall-clock
    /// elapsed time comes within `YIELD_MARGIN` of the invocation budget.
    pub async fn run(
        &self,
        mut state: LoopState,
        stop: &watch::Receiver<bool>,
    ) -> Result<RunOutcome, VolleyError> {
        let started = self.clock.now();
        let budget = chrono::Duration::from_std(self.invocation_budget)
            .unwrap_or_else(|_| chrono::Duration::seconds(900));
        let margin = chrono::Duration::from_std(YIELD_MARGIN)
            .unwrap_or_else(|_| chrono::Duration::seconds(2));

        let mut iterations: u32 = 0;
        loop {
            if iterations % STOP_POLL_INTERVAL == 0 && *stop.borrow() {
                debug!(task_id = %state.task.task_id, client = state.client, "run stopped externally");
                return Ok(RunOutcome::Ended);
            }

            if self.clock.now() - started + margin >= budget {
                debug!(task_id = %state.task.task_id, client = state.client, "invocation budget spent, yielding");
                return Ok(RunOutcome::Yield(state));
            }

            match self.step(state).await? {
                StepOutcome::Continue(next) => {
                    state = next;
                    iterations += 1;
                }
                StepOutcome::Ended => return Ok(RunOutcome::Ended),
            }
        }
    }

    /// Sleep until the next wall-clock second boundary.
    ///
    /// The milliseconds are read at the instant of the call, never cached,
    /// so repeated waves do not drift.
    async fn sleep_to_second_boundary(&self) {
        let ms = 1000 - u64::from(self.clock.now().timestamp_subsec_millis());
        self.clock.sleep(Duration::from_millis(ms)).await;
    }
}
