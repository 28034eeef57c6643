//! Job service for inspecting scheduled jobs.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::jobs::{JobResult, PersistedJobRecord};
use crate::trigger::TriggerStore;

/// Read-only view over the trigger store.
///
/// Results are a snapshot; jobs may fire or be removed right after.
#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn TriggerStore>,
}

impl JobService {
    /// Creates a new JobService over the given store.
    pub fn new(store: Arc<dyn TriggerStore>) -> Self {
        Self { store }
    }

    /// Lists scheduled jobs ordered by trigger time.
    pub async fn list_jobs(&self, job_group: Option<&str>) -> JobResult<Vec<PersistedJobRecord>> {
        Ok(self.store.list(job_group).await?)
    }

    /// Counts scheduled jobs.
    pub async fn count_jobs(&self, job_group: Option<&str>) -> JobResult<usize> {
        Ok(self.store.count(job_group).await?)
    }

    /// Distinct groups that currently have at least one scheduled job, sorted.
    pub async fn job_groups(&self) -> JobResult<Vec<String>> {
        let groups: BTreeSet<String> = self
            .store
            .list(None)
            .await?
            .into_iter()
            .map(|record| record.job_group)
            .collect();
        Ok(groups.into_iter().collect())
    }

    /// Name of the backing store.
    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }
}
