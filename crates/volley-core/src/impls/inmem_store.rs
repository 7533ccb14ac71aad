//! In-memory task store.
//!
//! One map keyed by (region, task id), so multi-region tasks hold one
//! independent copy per region exactly like the real store would.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Region, Task, TaskId, TaskStatus, UnitId, UnitState};
use crate::ports::{StoreError, TaskStore};

#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: Mutex<HashMap<(Region, TaskId), Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn get(&self, region: &Region, task_id: TaskId) -> Result<Option<Task>, StoreError> {
        let tasks = self.tasks.lock().await;
        Ok(tasks.get(&(region.clone(), task_id)).cloned())
    }

    async fn put(&self, task: Task) -> Result<(), StoreError> {
        let mut tasks = self.tasks.lock().await;
        tasks.insert((task.region.clone(), task.task_id), task);
        Ok(())
    }

    async fn update_unit_state(
        &self,
        region: &Region,
        task_id: TaskId,
        unit: &UnitId,
        state: UnitState,
    ) -> Result<bool, StoreError> {
        let mut tasks = self.tasks.lock().await;
        let Some(task) = tasks.get_mut(&(region.clone(), task_id)) else {
            return Ok(false);
        };
        let Some(slot) = task.states.get_mut(unit) else {
            return Ok(false);
        };
        *slot = state;
        Ok(true)
    }

    async fn update_status(
        &self,
        region: &Region,
        task_id: TaskId,
        status: TaskStatus,
    ) -> Result<(), StoreError> {
        let mut tasks = self.tasks.lock().await;
        if let Some(task) = tasks.get_mut(&(region.clone(), task_id)) {
            task.status = status;
        }
        Ok(())
    }

    async fn delete(&self, region: &Region, task_id: TaskId) -> Result<(), StoreError> {
        let mut tasks = self.tasks.lock().await;
        tasks.remove(&(region.clone(), task_id));
        Ok(())
    }

    async fn scan(&self, region: &Region) -> Result<Vec<Task>, StoreError> {
        let tasks = self.tasks.lock().await;
        Ok(tasks
            .values()
            .filter(|task| &task.region == region)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use ulid::Ulid;

    use super::*;
    use crate::domain::{Compute, HttpMethod, TaskKind};

    fn task(region: &str) -> Task {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        Task {
            task_id: TaskId::from_ulid(Ulid::new()),
            name: "store".into(),
            kind: TaskKind::Api,
            url: "https://example.com/".into(),
            method: HttpMethod::Get,
            compute: Compute::Function,
            n: Some(1),
            qps: None,
            c: 1,
            n_per_client: Some(1),
            timeout_ms: 1000,
            success_code: 200,
            start_time: t0,
            end_time: t0 + chrono::Duration::minutes(10),
            regions: vec![Region::new(region)],
            region: Region::new(region),
            report: false,
            states: [(UnitId::new("u1"), UnitState::Waiting)].into(),
            status: TaskStatus::Pending,
            created_at: t0,
        }
    }

    #[tokio::test]
    async fn copies_in_different_regions_are_independent() {
        let store = InMemoryTaskStore::new();
        let us = task("us-east-1");
        let mut eu = us.clone();
        eu.region = Region::new("eu-west-1");
        store.put(us.clone()).await.unwrap();
        store.put(eu.clone()).await.unwrap();

        store
            .update_unit_state(
                &Region::new("us-east-1"),
                us.task_id,
                &UnitId::new("u1"),
                UnitState::Running,
            )
            .await
            .unwrap();

        let us_copy = store
            .get(&Region::new("us-east-1"), us.task_id)
            .await
            .unwrap()
            .unwrap();
        let eu_copy = store
            .get(&Region::new("eu-west-1"), us.task_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(us_copy.states[&UnitId::new("u1")], UnitState::Running);
        assert_eq!(eu_copy.states[&UnitId::new("u1")], UnitState::Waiting);
    }

    #[tokio::test]
    async fn update_of_a_missing_key_reports_false() {
        let store = InMemoryTaskStore::new();
        let t = task("us-east-1");
        store.put(t.clone()).await.unwrap();

        let updated = store
            .update_unit_state(
                &Region::new("us-east-1"),
                TaskId::from_ulid(Ulid::new()),
                &UnitId::new("u1"),
                UnitState::Running,
            )
            .await
            .unwrap();
        assert!(!updated);

        let updated = store
            .update_unit_state(
                &Region::new("us-east-1"),
                t.task_id,
                &UnitId::new("nope"),
                UnitState::Running,
            )
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn delete_of_a_missing_task_is_not_an_error() {
        let store = InMemoryTaskStore::new();
        store
            .delete(&Region::new("us-east-1"), TaskId::from_ulid(Ulid::new()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn scan_only_returns_the_requested_region() {
        let store = InMemoryTaskStore::new();
        store.put(task("us-east-1")).await.unwrap();
        store.put(task("us-east-1")).await.unwrap();
        store.put(task("eu-west-1")).await.unwrap();

        let tasks = store.scan(&Region::new("us-east-1")).await.unwrap();
        assert_eq!(tasks.len(), 2);
    }
}
