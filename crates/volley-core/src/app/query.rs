//! Task reads: the global multi-region join and the per-region listing.

use std::sync::Arc;

use futures::future::join_all;
use tracing::warn;

use crate::domain::{Region, Task, TaskId, VolleyError};
use crate::ports::TaskStore;

/// Fetch every regional copy of a task in parallel.
///
/// Regions that error or no longer hold a copy are discarded rather than
/// failing the whole read; an unreachable region must not hide the rest.
pub async fn fetch_regional_copies(store: &Arc<dyn TaskStore>, primary: &Task) -> Vec<Task> {
    if primary.regions.len() <= 1 {
        return vec![primary.clone()];
    }

    let futures = primary
        .regions
        .iter()
        .map(|region| store.get(region, primary.task_id));
    let results = join_all(futures).await;

    primary
        .regions
        .iter()
        .zip(results)
        .filter_map(|(region, result)| match result {
            Ok(copy) => copy,
            Err(e) => {
                warn!(task_id = %primary.task_id, %region, error = %e, "regional copy unreadable, skipping");
                None
            }
        })
        .collect()
}

pub struct TaskQuery {
    store: Arc<dyn TaskStore>,
    home: Region,
}

impl TaskQuery {
    pub fn new(store: Arc<dyn TaskStore>, home: Region) -> Self {
        Self { store, home }
    }

    /// All regional copies of one task, resolved from the primary copy.
    pub async fn get(
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

    /// All tasks in one region, newest first.
    pub async fn list(&self, region: Option<&Region>) -> Result<Vec<Task>, VolleyError> {
        let region = region.unwrap_or(&self.home);
        let mut tasks = self.store.scan(region).await?;
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use ulid::Ulid;

    use super::*;
    use crate::domain::{Compute, HttpMethod, TaskKind, TaskStatus};
    use crate::impls::InMemoryTaskStore;

    fn task_at(regions: &[&str], created_at: DateTime<Utc>) -> Task {
        Task {
            task_id: TaskId::from_ulid(Ulid::new()),
            name: "query".into(),
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
            start_time: created_at,
            end_time: created_at + chrono::Duration::minutes(10),
            regions: regions.iter().map(|r| Region::new(*r)).collect(),
            region: Region::new(regions[0]),
            report: false,
            states: Default::default(),
            status: TaskStatus::Pending,
            created_at,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn get_joins_all_regional_copies() {
        let store = Arc::new(InMemoryTaskStore::new());
        let task = task_at(&["us-east-1", "eu-west-1"], t0());
        for region in &task.regions {
            let mut copy = task.clone();
            copy.region = region.clone();
            store.put(copy).await.unwrap();
        }

        let query = TaskQuery::new(store, Region::new("us-east-1"));
        let copies = query.get(task.task_id, None).await.unwrap();

        assert_eq!(copies.len(), 2);
    }

    #[tokio::test]
    async fn get_discards_regions_without_a_copy() {
        let store = Arc::new(InMemoryTaskStore::new());
        // The eu-west-1 copy was never written (its dispatch failed).
        let task = task_at(&["us-east-1", "eu-west-1"], t0());
        store.put(task.clone()).await.unwrap();

        let query = TaskQuery::new(store, Region::new("us-east-1"));
        let copies = query.get(task.task_id, None).await.unwrap();

        assert_eq!(copies.len(), 1);
        assert_eq!(copies[0].region, Region::new("us-east-1"));
    }

    #[tokio::test]
    async fn get_reports_a_missing_task() {
        let store = Arc::new(InMemoryTaskStore::new());
        let query = TaskQuery::new(store, Region::new("us-east-1"));

        let err = query
            .get(TaskId::from_ulid(Ulid::new()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, VolleyError::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn list_returns_newest_first() {
        let store = Arc::new(InMemoryTaskStore::new());
        let old = task_at(&["us-east-1"], t0());
        let new = task_at(&["us-east-1"], t0() + chrono::Duration::minutes(5));
        store.put(old.clone()).await.unwrap();
        store.put(new.clone()).await.unwrap();

        let query = TaskQuery::new(store, Region::new("us-east-1"));
        let tasks = query.list(None).await.unwrap();

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].task_id, new.task_id);
        assert_eq!(tasks[1].task_id, old.task_id);
    }
}
