//! Dispatcher: per-region fan-out that materializes execution units and
//! persists the regional task copies.
//!
//! Regions are independent failure domains: dispatch runs in parallel
//! across them and a failure in one region surfaces as that region's error
//! while the others proceed, so the overall result can be mixed.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{Compute, Region, Task, TaskStatus, UnitId, UnitState};
use crate::ports::{BackendError, ComputeBackend, StoreError, TaskStore};

/// VM provisioning calls accept at most this many instances at once.
const VM_PROVISION_BATCH: u32 = 20;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Compute kind -> backend table.
///
/// Built during wiring, immutable afterwards; the dispatcher and the abort
/// coordinator only ever select by the task's `compute` field.
#[derive(Default)]
pub struct BackendRegistry {
    backends: HashMap<Compute, Arc<dyn ComputeBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    pub fn register(mut self, compute: Compute, backend: Arc<dyn ComputeBackend>) -> Self {
        self.backends.insert(compute, backend);
        self
    }

    pub fn get(&self, compute: Compute) -> Result<&Arc<dyn ComputeBackend>, BackendError> {
        self.backends
            .get(&compute)
            .ok_or(BackendError::NotRegistered)
    }
}

/// Outcome of dispatching one task: per-region unit lists or errors.
#[derive(Debug)]
pub struct DispatchReport {
    pub per_region: Vec<(Region, Result<Vec<UnitId>, DispatchError>)>,
}

impl DispatchReport {
    /// Regions whose units were all created and persisted.
    pub fn succeeded(&self) -> Vec<&Region> {
        self.per_region
            .iter()
            .filter(|(_, r)| r.is_ok())
            .map(|(region, _)| region)
            .collect()
    }

    pub fn failed(&self) -> Vec<&Region> {
        self.per_region
            .iter()
            .filter(|(_, r)| r.is_err())
            .map(|(region, _)| region)
            .collect()
    }
}

pub struct Dispatcher {
    store: Arc<dyn TaskStore>,
    backends: Arc<BackendRegistry>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn TaskStore>, backends: Arc<BackendRegistry>) -> Self {
        Self { store, backends }
    }

    /// Fan the task out to all of its regions in parallel.
    pub async fn dispatch(&self, task: &Task) -> DispatchReport {
        let futures = task
            .regions
            .iter()
            .map(|region| self.dispatch_region(task, region));
        let outcomes = join_all(futures).await;

        let per_region: Vec<_> = task.regions.iter().cloned().zip(outcomes).collect();
        for (region, outcome) in &per_region {
            match outcome {
                Ok(units) => {
                    info!(task_id = %task.task_id, %region, units = units.len(), "dispatched")
                }
                Err(e) => warn!(task_id = %task.task_id, %region, error = %e, "dispatch failed"),
            }
        }
        DispatchReport { per_region }
    }

    /// Create this region's units and persist the regional copy.
    ///
    /// All-or-nothing within the region: any failure here is the whole
    /// region's failure.
    async fn dispatch_region(
        &self,
        task: &Task,
        region: &Region,
    ) -> Result<Vec<UnitId>, DispatchError> {
        let backend = self.backends.get(task.compute)?;

        let mut units: Vec<UnitId> = Vec::new();
        for (count, client_offset) in provision_chunks(task.compute, unit_count(task)) {
            units.extend(
                backend
                    .create_units(region, task, count, client_offset)
                    .await?,
            );
        }

        let mut copy = task.clone();
        copy.region = region.clone();
        copy.states = units
            .iter()
            .map(|u| (u.clone(), UnitState::Waiting))
            .collect();
        copy.status = TaskStatus::Pending;
        self.store.put(copy).await?;

        Ok(units)
    }
}

/// How many units one region needs.
///
/// Rate mode on the function backend uses a single pacing-loop instance;
/// everything else runs one unit per client.
fn unit_count(task: &Task) -> u32 {
    if task.compute == Compute::Function && task.is_rate_mode() {
        1
    } else {
        task.c
    }
}

/// Split the unit count into provisioning calls with client offsets.
///
/// VM provisioning is chunked; the other backends take the whole count in
/// one call (a container service runs `count` replicas, a batch service
/// one job with array size `count`).
fn provision_chunks(compute: Compute, count: u32) -> Vec<(u32, u32)> {
    match compute {
        Compute::Vm => {
            let mut chunks = Vec::new();
            let mut offset = 0;
            while offset < count {
                let size = (count - offset).min(VM_PROVISION_BATCH);
                chunks.push((size, offset));
                offset += size;
            }
            chunks
        }
        _ => vec![(count, 0)],
    }
}
