#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use deferred_rs::config::SchedulerConfig;
use deferred_rs::jobs::{JobExecutor, JobId, JsonPayloadCodec};
use deferred_rs::{CodecRegistry, DispatchRegistry};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

pub const NOTICE_TAG: &str = "hearing-notice";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub case_id: u64,
    pub message: String,
}

impl Notice {
    pub fn new(case_id: u64) -> Self {
        Self {
            case_id,
            message: format!("hearing listed for case {case_id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub job_id: JobId,
    pub job_group: String,
    pub job_name: String,
    pub payload: Notice,
    pub executed_at: Timestamp,
}

/// Executor that records every call it receives, with the time it ran
#[derive(Clone, Default)]
pub struct RecordingExecutor {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingExecutor {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, job_id: &JobId) -> usize {
        self.calls()
            .iter()
            .filter(|call| &call.job_id == job_id)
            .count()
    }

    /// Wait until at least `expected` calls were recorded or `timeout` passes
    pub async fn wait_for(&self, expected: usize, timeout: Duration) -> usize {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let seen = self.calls.lock().unwrap().len();
            if seen >= expected || tokio::time::Instant::now() >= deadline {
                return seen;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }
}

#[async_trait]
impl JobExecutor<Notice> for RecordingExecutor {
    async fn execute(
        &self,
        job_id: &JobId,
        job_group: &str,
        job_name: &str,
        payload: Notice,
    ) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(Call {
            job_id: job_id.clone(),
            job_group: job_group.to_string(),
            job_name: job_name.to_string(),
            payload,
            executed_at: Timestamp::now(),
        });
        Ok(())
    }
}

/// Scenario window: a job must have fired, or not, by this deadline
pub const WINDOW: Duration = Duration::from_secs(10);

pub fn test_config() -> SchedulerConfig {
    SchedulerConfig {
        poll_interval_ms: 1000,
        shutdown_timeout_seconds: 5,
        ..Default::default()
    }
}

pub fn notice_codecs() -> CodecRegistry {
    let mut codecs = CodecRegistry::new();
    codecs.register::<Notice, _>(NOTICE_TAG, JsonPayloadCodec::<Notice>::new());
    codecs
}

pub fn notice_dispatch(executor: &RecordingExecutor) -> DispatchRegistry {
    let mut dispatch = DispatchRegistry::new();
    dispatch.register_tag(NOTICE_TAG, JsonPayloadCodec::<Notice>::new(), executor.clone());
    dispatch
}
