//! Task validator: raw creation request in, normalized task out.
//!
//! Pure except for the region-availability check. Checks run in a fixed
//! order (required fields, n/qps exclusivity, numeric bounds, time window,
//! region availability) and fail fast on the first violation; the order
//! matters for user experience, not correctness.

use std::sync::Arc;

use chrono::Duration;
use thiserror::Error;

use crate::domain::{
    Compute, HttpMethod, Region, Task, TaskKind, TaskSpec, TaskStatus,
};
use crate::ports::{Clock, IdGenerator, RegionOracle};

const DEFAULT_TIMEOUT_MS: u64 = 1000;
const DEFAULT_SUCCESS_CODE: u16 = 200;
const DEFAULT_WINDOW_MINUTES: i64 = 10;
const MAX_WINDOW_HOURS: i64 = 48;
const START_SKEW_TOLERANCE_HOURS: i64 = 1;

/// One variant per violated invariant; the message is what the user sees.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("name is empty")]
    MissingName,

    #[error("kind is empty")]
    MissingKind,

    #[error("kind must be one of [API, HTML]")]
    InvalidKind,

    #[error("url is empty")]
    MissingUrl,

    #[error("url is invalid")]
    InvalidUrl,

    #[error("method is empty")]
    MissingMethod,

    #[error("method must be one of [GET, POST]")]
    InvalidMethod,

    #[error("n and qps can not be both empty")]
    NeitherCountNorRate,

    #[error("n and qps can not be both set")]
    BothCountAndRate,

    #[error("n must be greater than 0")]
    NonPositiveCount,

    #[error("qps must be greater than 0")]
    NonPositiveRate,

    #[error("c must be greater than 0")]
    NonPositiveConcurrency,

    #[error("c must be less than or equal to n")]
    ConcurrencyExceedsCount,

    #[error("timeout must be greater than 0")]
    NonPositiveTimeout,

    #[error("successCode must be a valid HTTP status")]
    InvalidSuccessCode,

    #[error("delay must be greater than 0")]
    NonPositiveDelay,

    #[error("delay is out of range")]
    DelayOutOfRange,

    #[error("startTime must be greater than now - 1 hour")]
    StartTooOld,

    #[error("endTime must be greater than now")]
    EndInPast,

    #[error("endTime must be greater than startTime")]
    EndBeforeStart,

    #[error("endTime must be less than startTime + 48 hours")]
    WindowTooLong,

    #[error("stack not deployed in [{missing}] yet, available regions [{available}]")]
    RegionsUnavailable { missing: String, available: String },

    #[error("region availability check failed: {0}")]
    RegionCheck(String),
}

pub struct TaskValidator {
    oracle: Arc<dyn RegionOracle>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,

    /// Region used when the request names none.
    home: Region,
}

impl TaskValidator {
    pub fn new(
        oracle: Arc<dyn RegionOracle>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        home: Region,
    ) -> Self {
        Self {
            oracle,
            clock,
            ids,
            home,
        }
    }

    pub async fn validate(&self, spec: TaskSpec) -> Result<Task, ValidationError> {
        let name = match spec.name.as_deref() {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => return Err(ValidationError::MissingName),
        };

        let kind = match spec.kind.as_deref() {
            Some(s) if !s.is_empty() => {
                TaskKind::parse(s).ok_or(ValidationError::InvalidKind)?
            }
            _ => return Err(ValidationError::MissingKind),
        };

        let url = match spec.url.as_deref() {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => return Err(ValidationError::MissingUrl),
        };
        reqwest::Url::parse(&url).map_err(|_| ValidationError::InvalidUrl)?;

        let method = match spec.method.as_deref() {
            Some(s) if !s.is_empty() => {
                HttpMethod::parse(s).ok_or(ValidationError::InvalidMethod)?
            }
            _ => return Err(ValidationError::MissingMethod),
        };

        match (spec.n, spec.qps) {
            (None, None) => return Err(ValidationError::NeitherCountNorRate),
            (Some(_), Some(_)) => return Err(ValidationError::BothCountAndRate),
            _ => {}
        }

        if spec.n == Some(0) {
            return Err(ValidationError::NonPositiveCount);
        }
        if spec.qps == Some(0) {
            return Err(ValidationError::NonPositiveRate);
        }
        if spec.c == Some(0) {
            return Err(ValidationError::NonPositiveConcurrency);
        }
        let c = spec.c.unwrap_or(1);
        if let Some(n) = spec.n
            && u64::from(c) > n
        {
            return Err(ValidationError::ConcurrencyExceedsCount);
        }

        let timeout_ms = spec.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);
        if timeout_ms == 0 {
            return Err(ValidationError::NonPositiveTimeout);
        }

        let success_code = spec.success_code.unwrap_or(DEFAULT_SUCCESS_CODE);
        if !(100..=599).contains(&success_code) {
            return Err(ValidationError::InvalidSuccessCode);
        }

        let delay = match spec.delay_seconds {
            Some(0) => return Err(ValidationError::NonPositiveDelay),
            Some(seconds) => {
                // must survive delays that overflow i64 or chrono's range
                let seconds =
                    i64::try_from(seconds).map_err(|_| ValidationError::DelayOutOfRange)?;
                Duration::try_seconds(seconds).ok_or(ValidationError::DelayOutOfRange)?
            }
            None => Duration::zero(),
        };

        let now = self.clock.now();

        let start_time = match spec.start_time {
            Some(start) => {
                if start < now - Duration::hours(START_SKEW_TOLERANCE_HOURS) {
                    return Err(ValidationError::StartTooOld);
                }
                start
            }
            None => now + delay,
        };

        let end_time = match spec.end_time {
            Some(end) => {
                if end < now {
                    return Err(ValidationError::EndInPast);
                }
                end
            }
            None => start_time + Duration::minutes(DEFAULT_WINDOW_MINUTES),
        };

        if end_time <= start_time {
            return Err(ValidationError::EndBeforeStart);
        }
        if end_time > start_time + Duration::hours(MAX_WINDOW_HOURS) {
            return Err(ValidationError::WindowTooLong);
        }

        let regions = if spec.regions.is_empty() {
            vec![self.home.clone()]
        } else {
            spec.regions.clone()
        };
        let deployed = self
            .oracle
            .deployed_regions()
            .await
            .map_err(|e| ValidationError::RegionCheck(e.to_string()))?;
        let missing: Vec<&Region> = regions.iter().filter(|r| !deployed.contains(r)).collect();
        if !missing.is_empty() {
            return Err(ValidationError::RegionsUnavailable {
                missing: join(&missing),
                available: join(&deployed.iter().collect::<Vec<_>>()),
            });
        }

        let n_per_client = spec.n.map(|n| n.div_ceil(u64::from(c)));

        Ok(Task {
            task_id: self.ids.generate_task_id(),
            name,
            kind,
            url,
            method,
            compute: spec.compute.unwrap_or(Compute::Function),
            n: spec.n,
            qps: spec.qps,
            c,
            n_per_client,
            timeout_ms,
            success_code,
            start_time,
            end_time,
            region: regions[0].clone(),
            regions,
            report: spec.report,
            states: Default::default(),
            status: TaskStatus::Pending,
            created_at: now,
        })
    }
}

fn join(regions: &[&Region]) -> String {
    regions
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use rstest::rstest;

    use super::*;
    use crate::domain::VolleyError;
    use crate::ports::{ManualClock, UlidGenerator};

    struct StaticOracle(Vec<Region>);

    #[async_trait]
    impl RegionOracle for StaticOracle {
        async fn deployed_regions(&self) -> Result<Vec<Region>, VolleyError> {
            Ok(self.0.clone())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn validator_with(deployed: &[&str]) -> TaskValidator {
        let clock = Arc::new(ManualClock::new(now()));
        TaskValidator::new(
            Arc::new(StaticOracle(
                deployed.iter().map(|r| Region::new(*r)).collect(),
            )),
            clock.clone(),
            Arc::new(UlidGenerator::new(ManualClock::new(now()))),
            Region::new("us-east-1"),
        )
    }

    fn base_spec() -> TaskSpec {
        TaskSpec {
            name: Some("smoke".into()),
            kind: Some("api".into()),
            url: Some("https://example.com/health".into()),
            method: Some("get".into()),
            n: Some(100),
            c: Some(10),
            ..Default::default()
        }
    }

    #[rstest]
    #[case(TaskSpec { name: None, ..base_spec() }, ValidationError::MissingName)]
    #[case(TaskSpec { kind: Some("rpc".into()), ..base_spec() }, ValidationError::InvalidKind)]
    #[case(TaskSpec { url: Some("not a url".into()), ..base_spec() }, ValidationError::InvalidUrl)]
    #[case(TaskSpec { method: Some("PUT".into()), ..base_spec() }, ValidationError::InvalidMethod)]
    #[case(TaskSpec { n: None, qps: None, ..base_spec() }, ValidationError::NeitherCountNorRate)]
    #[case(TaskSpec { n: Some(10), qps: Some(5), ..base_spec() }, ValidationError::BothCountAndRate)]
    #[case(TaskSpec { n: Some(0), c: None, ..base_spec() }, ValidationError::NonPositiveCount)]
    #[case(TaskSpec { n: None, qps: Some(0), ..base_spec() }, ValidationError::NonPositiveRate)]
    #[case(TaskSpec { c: Some(0), ..base_spec() }, ValidationError::NonPositiveConcurrency)]
    #[case(TaskSpec { n: Some(5), c: Some(10), ..base_spec() }, ValidationError::ConcurrencyExceedsCount)]
    #[case(TaskSpec { timeout_ms: Some(0), ..base_spec() }, ValidationError::NonPositiveTimeout)]
    #[case(TaskSpec { success_code: Some(99), ..base_spec() }, ValidationError::InvalidSuccessCode)]
    #[case(TaskSpec { delay_seconds: Some(0), ..base_spec() }, ValidationError::NonPositiveDelay)]
    #[case(TaskSpec { delay_seconds: Some(u64::MAX / 2), ..base_spec() }, ValidationError::DelayOutOfRange)]
    #[case(TaskSpec { delay_seconds: Some(u64::MAX), ..base_spec() }, ValidationError::DelayOutOfRange)]
    #[tokio::test]
    async fn rejects_invalid_specs(#[case] spec: TaskSpec, #[case] expected: ValidationError) {
        let validator = validator_with(&["us-east-1"]);
        assert_eq!(validator.validate(spec).await.unwrap_err(), expected);
    }

    #[tokio::test]
    async fn rejects_bad_time_windows() {
        let validator = validator_with(&["us-east-1"]);

        let spec = TaskSpec {
            start_time: Some(now() - Duration::hours(2)),
            ..base_spec()
        };
        assert_eq!(
            validator.validate(spec).await.unwrap_err(),
            ValidationError::StartTooOld
        );

        let spec = TaskSpec {
            end_time: Some(now() - Duration::minutes(1)),
            ..base_spec()
        };
        assert_eq!(
            validator.validate(spec).await.unwrap_err(),
            ValidationError::EndInPast
        );

        let spec = TaskSpec {
            start_time: Some(now() + Duration::hours(2)),
            end_time: Some(now() + Duration::hours(1)),
            ..base_spec()
        };
        assert_eq!(
            validator.validate(spec).await.unwrap_err(),
            ValidationError::EndBeforeStart
        );

        let spec = TaskSpec {
            start_time: Some(now()),
            end_time: Some(now() + Duration::hours(49)),
            ..base_spec()
        };
        assert_eq!(
            validator.validate(spec).await.unwrap_err(),
            ValidationError::WindowTooLong
        );
    }

    #[tokio::test]
    async fn normalizes_a_fixed_count_task() {
        let validator = validator_with(&["us-east-1"]);
        let task = validator.validate(base_spec()).await.unwrap();

        assert_eq!(task.kind, TaskKind::Api);
        assert_eq!(task.method, HttpMethod::Get);
        assert_eq!(task.n, Some(100));
        assert_eq!(task.c, 10);
        assert_eq!(task.n_per_client, Some(10));
        assert_eq!(task.timeout_ms, 1000);
        assert_eq!(task.success_code, 200);
        assert_eq!(task.start_time, now());
        assert_eq!(task.end_time, now() + Duration::minutes(10));
        assert_eq!(task.regions, vec![Region::new("us-east-1")]);
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.states.is_empty());
    }

    #[tokio::test]
    async fn n_per_client_rounds_up() {
        let validator = validator_with(&["us-east-1"]);
        let spec = TaskSpec {
            n: Some(101),
            c: Some(10),
            ..base_spec()
        };
        let task = validator.validate(spec).await.unwrap();
        assert_eq!(task.n_per_client, Some(11));
    }

    #[tokio::test]
    async fn delay_shifts_the_default_window() {
        let validator = validator_with(&["us-east-1"]);
        let spec = TaskSpec {
            delay_seconds: Some(30),
            ..base_spec()
        };
        let task = validator.validate(spec).await.unwrap();
        assert_eq!(task.start_time, now() + Duration::seconds(30));
        assert_eq!(task.end_time, task.start_time + Duration::minutes(10));
    }

    #[tokio::test]
    async fn names_missing_and_available_regions() {
        let validator = validator_with(&["us-east-1"]);
        let spec = TaskSpec {
            regions: vec![Region::new("us-east-1"), Region::new("eu-west-1")],
            ..base_spec()
        };
        let err = validator.validate(spec).await.unwrap_err();
        match err {
            ValidationError::RegionsUnavailable { missing, available } => {
                assert_eq!(missing, "eu-west-1");
                assert_eq!(available, "us-east-1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn defaults_to_the_home_region() {
        let validator = validator_with(&["us-east-1"]);
        let task = validator.validate(base_spec()).await.unwrap();
        assert_eq!(task.regions, vec![Region::new("us-east-1")]);
        assert_eq!(task.region, Region::new("us-east-1"));
    }
}
