//! TriggerStore trait definition.

use async_trait::async_trait;
use jiff::Timestamp;

use crate::jobs::{JobId, PersistedJobRecord};
use crate::trigger::StoreError;

/// Durable home of scheduled job records.
///
/// Implementations must make `claim_due` and `remove` race-safe against each
/// other: whichever call deletes a record first owns it, and the loser sees
/// nothing. That single rule is what gives "removal before firing means zero
/// executions" and "each record fires at most once".
#[async_trait]
pub trait TriggerStore: Send + Sync {
    /// Persist a record. Returns only after the backend has accepted the write.
    async fn insert(&self, record: PersistedJobRecord) -> Result<(), StoreError>;

    /// Delete one record if it exists and belongs to `job_group`.
    async fn remove(&self, job_id: &JobId, job_group: &str) -> Result<bool, StoreError>;

    /// Delete every record in `job_group`, returning how many were deleted.
    async fn remove_group(&self, job_group: &str) -> Result<usize, StoreError>;

    /// Atomically delete and return up to `limit` records due at `now`,
    /// oldest trigger time first.
    async fn claim_due(
        &self,
        now: Timestamp,
        limit: usize,
    ) -> Result<Vec<PersistedJobRecord>, StoreError>;

    /// Currently scheduled records, optionally restricted to one group,
    /// ordered by trigger time.
    async fn list(&self, job_group: Option<&str>) -> Result<Vec<PersistedJobRecord>, StoreError>;

    /// Number of currently scheduled records, optionally restricted to one group.
    async fn count(&self, job_group: Option<&str>) -> Result<usize, StoreError> {
        Ok(self.list(job_group).await?.len())
    }

    /// Backend name for logs.
    fn backend_name(&self) -> &'static str;
}
