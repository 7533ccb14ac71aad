//! In-memory fan-out channel.
//!
//! One FIFO per topic behind a single mutex, with a `Notify` to wake a
//! waiting consumer per pushed item. Implements both sides so a local
//! deployment wires the pacing loop straight to the worker group.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use crate::domain::WorkItem;
use crate::ports::{FanoutChannel, FanoutError, WorkSource};

#[derive(Default)]
pub struct InMemoryFanout {
    topics: Mutex<HashMap<String, VecDeque<WorkItem>>>,
    notify: Notify,
}

impl InMemoryFanout {
    pub fn new() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            notify: Notify::new(),
        }
    }

    async fn try_pop(&self, topic: &str) -> Option<WorkItem> {
        let mut topics = self.topics.lock().await;
        topics.get_mut(topic)?.pop_front()
    }
}

#[async_trait]
impl FanoutChannel for InMemoryFanout {
    async fn publish_batch(&self, topic: &str, items: Vec<WorkItem>) -> Result<(), FanoutError> {
        if items.is_empty() {
            return Ok(());
        }
        let count = items.len();
        {
            let mut topics = self.topics.lock().await;
            topics.entry(topic.to_owned()).or_default().extend(items);
        }
        // one permit per item so every waiting consumer gets a chance
        for _ in 0..count {
            self.notify.notify_one();
        }
        Ok(())
    }
}

#[async_trait]
impl WorkSource for InMemoryFanout {
    async fn next(&self, topic: &str, timeout: Duration) -> Option<WorkItem> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(item) = self.try_pop(topic).await {
                return Some(item);
            }
            if tokio::time::timeout_at(deadline, self.notify.notified())
                .await
                .is_err()
            {
                return self.try_pop(topic).await;
            }
        }
    }
}
