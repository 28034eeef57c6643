use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::jobs::models::JobId;

/// Business callback invoked with a rehydrated payload when its job fires
///
/// Implementations may be called concurrently for different jobs. An `Err`
/// is logged and the job is still considered consumed; there is no retry.
#[async_trait]
pub trait JobExecutor<T>: Send + Sync
where
    T: Send + 'static,
{
    async fn execute(
        &self,
        job_id: &JobId,
        job_group: &str,
        job_name: &str,
        payload: T,
    ) -> anyhow::Result<()>;
}

/// Counts executions currently running, per job group
#[derive(Clone, Default)]
pub struct InFlightTracker {
    running: Arc<RwLock<HashMap<String, usize>>>,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn increment(&self, job_group: &str) {
        let mut running = self.running.write().await;
        *running.entry(job_group.to_string()).or_insert(0) += 1;
    }

    pub async fn decrement(&self, job_group: &str) {
        let mut running = self.running.write().await;
        if let Some(count) = running.get_mut(job_group) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                running.remove(job_group);
            }
        }
    }

    pub async fn count(&self, job_group: &str) -> usize {
        self.running.read().await.get(job_group).copied().unwrap_or(0)
    }

    pub async fn total(&self) -> usize {
        self.running.read().await.values().sum()
    }

    /// Groups with at least one running execution
    pub async fn snapshot(&self) -> HashMap<String, usize> {
        self.running.read().await.clone()
    }
}
