//! IdGenerator port - id minting behind a seam.
//!
//! ULIDs sort by creation time and need no coordination across regions.
//! Generation goes through the `Clock` so a fixed clock yields ids with a
//! deterministic timestamp part in tests.

use ulid::Ulid;

use crate::domain::{ProbeId, TaskId};
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self) -> TaskId;

    fn generate_probe_id(&self) -> ProbeId;
}

/// ULID-based generator over a clock.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_task_id(&self) -> TaskId {
        TaskId::from_ulid(self.next_ulid())
    }

    fn generate_probe_id(&self) -> ProbeId {
        ProbeId::from_ulid(self.next_ulid())
    }
}
