//! HTTP prober over a shared reqwest client.
//!
//! The probe never fails: a transport error or timeout becomes a failure
//! row with the error message, a response becomes a row judged solely by
//! whether the status matched the item's expected code.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::domain::{HttpMethod, ProbeRecord, WorkItem};
use crate::ports::{Clock, IdGenerator, Prober};

pub struct HttpProber {
    client: reqwest::Client,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl HttpProber {
    pub fn new(ids: Arc<dyn IdGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self {
            client: reqwest::Client::new(),
            ids,
            clock,
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, item: &WorkItem) -> ProbeRecord {
        let request = match item.method {
            HttpMethod::Get => self.client.get(item.url.as_str()),
            HttpMethod::Post => self.client.post(item.url.as_str()),
        }
        .timeout(Duration::from_millis(item.timeout_ms));

        let started = Instant::now();
        let outcome = request.send().await;
        let ms = started.elapsed().as_millis() as u64;

        let (success, message) = match outcome {
            Ok(response) => (response.status().as_u16() == item.success_code, String::new()),
            Err(e) => (false, e.to_string()),
        };

        ProbeRecord {
            id: self.ids.generate_probe_id(),
            task_id: item.task_id,
            url: item.url.clone(),
            success,
            message,
            ms,
            time: self.clock.now(),
        }
    }
}
