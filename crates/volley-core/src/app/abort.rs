//! Abort and cleanup coordinator.
//!
//! Aborting stops every still-live unit across all regional copies of a
//! task; deletion stops them first and then removes the copies. Both are
//! best-effort per unit and per region: one stuck backend or unreachable
//! region never blocks the rest, and repeating either call is safe.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use crate::app::dispatcher::BackendRegistry;
use crate::app::query::fetch_regional_copies;
use crate::domain::{Region, Task, TaskId, UnitId, VolleyError};
use crate::ports::TaskStore;

/// What the abort attempted and how much of it failed.
#[derive(Debug, Default)]
pub struct AbortReport {
    pub stop_calls: usize,
    pub failures: usize,
}

pub struct AbortCoordinator {
    store: Arc<dyn TaskStore>,
    backends: Arc<BackendRegistry>,
    home: Region,
}

impl AbortCoordinator {
    pub fn new(store: Arc<dyn TaskStore>, backends: Arc<BackendRegistry>, home: Region) -> Self {
        Self {
            store,
            backends,
            home,
        }
    }

    /// Stop every live unit of the task, in every region it runs in.
    ///
    /// Units already terminal are skipped; stop failures are counted and
    /// logged but do not short-circuit the remaining units. State updates
    /// arrive through the normal notification path, not from here.
    pub async fn abort(
        &self,
        task_id: TaskId,
        region: Option<&Region>,
    ) -> Result<AbortReport, VolleyError> {
        let copies = self.resolve_copies(task_id, region).await?;
        let report = self.stop_live_units(&copies).await;
        info!(
            %task_id,
            stop_calls = report.stop_calls,
            failures = report.failures,
            "abort issued"
        );
        Ok(report)
    }

    /// Abort the task, then remove every regional copy from the store.
    ///
    /// Copies that cannot be removed are logged and skipped; a later
    /// delete retry will catch them.
    pub async fn delete(
        &self,
        task_id: TaskId,
        region: Option<&Region>,
    ) -> Result<AbortReport, VolleyError> {
        let copies = self.resolve_copies(task_id, region).await?;
        let report = self.stop_live_units(&copies).await;

        let deletes = copies
            .iter()
            .map(|copy| self.store.delete(&copy.region, task_id));
        for (copy, result) in copies.iter().zip(join_all(deletes).await) {
            if let Err(e) = result {
                warn!(%task_id, region = %copy.region, error = %e, "copy delete failed");
            }
        }

        info!(%task_id, regions = copies.len(), "deleted");
        Ok(report)
    }

    async fn resolve_copies(
        &self,
        task_id: TaskId,
        region: Option<&Region>,
    ) -> Result<Vec<Task>, VolleyError> {
        let region = region.unwrap_or(&self.home);
        let primary = self
            .store
            .get(region, task_id)
            .await?
            .ok_or(VolleyError::TaskNotFound(task_id))?;
        Ok(fetch_regional_copies(&self.store, &primary).await)
    }

    async fn stop_live_units(&self, copies: &[Task]) -> AbortReport {
        let mut targets: Vec<(&Task, UnitId)> = Vec::new();
        for copy in copies {
            for unit in copy.live_units() {
                targets.push((copy, unit));
            }
        }

        let stops = targets.iter().map(|(copy, unit)| async move {
            let backend = match self.backends.get(copy.compute) {
                Ok(backend) => backend,
                Err(e) => return Err((copy.region.clone(), unit.clone(), e.to_string())),
            };
            backend
                .stop_unit(&copy.region, unit)
                .await
                .map_err(|e| (copy.region.clone(), unit.clone(), e.to_string()))
        });

        let mut report = AbortReport {
            stop_calls: targets.len(),
            failures: 0,
        };
        for result in join_all(stops).await {
            if let Err((region, unit, message)) = result {
                warn!(%region, %unit, error = %message, "unit stop failed");
                report.failures += 1;
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use ulid::Ulid;

    use super::*;
    use crate::domain::{Compute, HttpMethod, TaskKind, TaskStatus, UnitState};
    use crate::impls::InMemoryTaskStore;
    use crate::ports::{BackendError, ComputeBackend};

    struct StoppableBackend {
        stopped: Mutex<Vec<(Region, UnitId)>>,
        fail_unit: Option<UnitId>,
    }

    impl StoppableBackend {
        fn new() -> Self {
            Self {
                stopped: Mutex::new(Vec::new()),
                fail_unit: None,
            }
        }

        fn failing_on(unit: &str) -> Self {
            Self {
                stopped: Mutex::new(Vec::new()),
                fail_unit: Some(UnitId::new(unit)),
            }
        }

        fn stopped(&self) -> Vec<(Region, UnitId)> {
            self.stopped.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ComputeBackend for StoppableBackend {
        async fn create_units(
            &self,
            _region: &Region,
            _task: &Task,
            _count: u32,
            _client_offset: u32,
        ) -> Result<Vec<UnitId>, BackendError> {
            Ok(Vec::new())
        }

        async fn stop_unit(&self, region: &Region, unit: &UnitId) -> Result<(), BackendError> {
            if self.fail_unit.as_ref() == Some(unit) {
                return Err(BackendError::StopFailed {
                    unit: unit.clone(),
                    message: "backend unavailable".into(),
                });
            }
            self.stopped
                .lock()
                .unwrap()
                .push((region.clone(), unit.clone()));
            Ok(())
        }
    }

    fn task_with(regions: &[&str], units: &[(&str, UnitState)]) -> Task {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let states: BTreeMap<UnitId, UnitState> = units
            .iter()
            .map(|(u, s)| (UnitId::new(*u), *s))
            .collect();
        Task {
            task_id: TaskId::from_ulid(Ulid::new()),
            name: "abort".into(),
            kind: TaskKind::Api,
            url: "https://example.com/".into(),
            method: HttpMethod::Get,
            compute: Compute::Function,
            n: Some(10),
            qps: None,
            c: units.len().max(1) as u32,
            n_per_client: Some(10),
            timeout_ms: 1000,
            success_code: 200,
            start_time: t0,
            end_time: t0 + chrono::Duration::minutes(10),
            regions: regions.iter().map(|r| Region::new(*r)).collect(),
            region: Region::new(regions[0]),
            report: false,
            states,
            status: TaskStatus::Running,
            created_at: t0,
        }
    }

    async fn seed(store: &Arc<InMemoryTaskStore>, task: &Task) {
        for region in &task.regions {
            let mut copy = task.clone();
            copy.region = region.clone();
            store.put(copy).await.unwrap();
        }
    }

    fn coordinator(
        store: Arc<InMemoryTaskStore>,
        backend: Arc<StoppableBackend>,
    ) -> AbortCoordinator {
        let registry = Arc::new(BackendRegistry::new().register(Compute::Function, backend));
        AbortCoordinator::new(store, registry, Region::new("us-east-1"))
    }

    #[tokio::test]
    async fn stops_live_units_in_every_region() {
        let store = Arc::new(InMemoryTaskStore::new());
        let backend = Arc::new(StoppableBackend::new());
        let task = task_with(
            &["us-east-1", "eu-west-1"],
            &[("a", UnitState::Running), ("b", UnitState::Waiting)],
        );
        seed(&store, &task).await;

        let coordinator = coordinator(store, backend.clone());
        let report = coordinator.abort(task.task_id, None).await.unwrap();

        assert_eq!(report.stop_calls, 4);
        assert_eq!(report.failures, 0);
        assert_eq!(backend.stopped().len(), 4);
    }

    #[tokio::test]
    async fn terminal_units_are_not_stopped() {
        let store = Arc::new(InMemoryTaskStore::new());
        let backend = Arc::new(StoppableBackend::new());
        let task = task_with(
            &["us-east-1"],
            &[("a", UnitState::Succeeded), ("b", UnitState::Failed)],
        );
        seed(&store, &task).await;

        let coordinator = coordinator(store, backend.clone());
        let report = coordinator.abort(task.task_id, None).await.unwrap();

        assert_eq!(report.stop_calls, 0);
        assert!(backend.stopped().is_empty());
    }

    #[tokio::test]
    async fn one_failing_unit_does_not_block_the_others() {
        let store = Arc::new(InMemoryTaskStore::new());
        let backend = Arc::new(StoppableBackend::failing_on("b"));
        let task = task_with(
            &["us-east-1"],
            &[("a", UnitState::Running), ("b", UnitState::Running)],
        );
        seed(&store, &task).await;

        let coordinator = coordinator(store, backend.clone());
        let report = coordinator.abort(task.task_id, None).await.unwrap();

        assert_eq!(report.stop_calls, 2);
        assert_eq!(report.failures, 1);
        assert_eq!(
            backend.stopped(),
            vec![(Region::new("us-east-1"), UnitId::new("a"))]
        );
    }

    #[tokio::test]
    async fn abort_of_an_unknown_task_is_an_error() {
        let store = Arc::new(InMemoryTaskStore::new());
        let backend = Arc::new(StoppableBackend::new());
        let coordinator = coordinator(store, backend);

        let err = coordinator
            .abort(TaskId::from_ulid(Ulid::new()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, VolleyError::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn delete_removes_every_regional_copy() {
        let store = Arc::new(InMemoryTaskStore::new());
        let backend = Arc::new(StoppableBackend::new());
        let task = task_with(
            &["us-east-1", "eu-west-1"],
            &[("a", UnitState::Running)],
        );
        seed(&store, &task).await;

        let coordinator = coordinator(store.clone(), backend);
        coordinator.delete(task.task_id, None).await.unwrap();

        for region in &task.regions {
            assert!(store.get(region, task.task_id).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn repeated_abort_is_safe() {
        let store = Arc::new(InMemoryTaskStore::new());
        let backend = Arc::new(StoppableBackend::new());
        let task = task_with(&["us-east-1"], &[("a", UnitState::Running)]);
        seed(&store, &task).await;

        let coordinator = coordinator(store, backend.clone());
        coordinator.abort(task.task_id, None).await.unwrap();
        coordinator.abort(task.task_id, None).await.unwrap();

        // Stopping an already stopped unit is the backend's problem to
        // absorb; both rounds go through.
        assert_eq!(backend.stopped().len(), 2);
    }
}
