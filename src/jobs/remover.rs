use std::sync::Arc;

use crate::jobs::error::JobResult;
use crate::jobs::models::JobId;
use crate::trigger::TriggerStore;

/// Cancels scheduled jobs
///
/// Removal races with firing: whichever deletes the record first wins. A job
/// already claimed by the runner keeps running.
#[derive(Clone)]
pub struct JobRemover {
    store: Arc<dyn TriggerStore>,
}

impl JobRemover {
    pub fn new(store: Arc<dyn TriggerStore>) -> Self {
        Self { store }
    }

    /// Remove one job. `Ok(false)` when nothing matched `job_id` in `job_group`.
    pub async fn remove(&self, job_id: &JobId, job_group: &str) -> JobResult<bool> {
        let removed = self.store.remove(job_id, job_group).await?;
        if removed {
            tracing::info!(job_id = %job_id, job_group = %job_group, "Job removed");
        } else {
            tracing::debug!(job_id = %job_id, job_group = %job_group, "No job to remove");
        }
        Ok(removed)
    }

    /// Remove every job in `job_group`, returning how many were removed
    pub async fn remove_group(&self, job_group: &str) -> JobResult<usize> {
        let removed = self.store.remove_group(job_group).await?;
        tracing::info!(job_group = %job_group, removed, "Job group removed");
        Ok(removed)
    }
}
