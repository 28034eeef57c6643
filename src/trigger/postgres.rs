//! PostgreSQL trigger store on top of [`TriggerRepository`].

use async_trait::async_trait;
use jiff::Timestamp;

use crate::db::AsyncDbPool;
use crate::jobs::{JobId, PersistedJobRecord};
use crate::models::TriggerRow;
use crate::repositories::TriggerRepository;
use crate::trigger::{StoreError, TriggerStore};

#[derive(Clone)]
pub struct PostgresTriggerStore {
    repo: TriggerRepository,
}

impl PostgresTriggerStore {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self {
            repo: TriggerRepository::new(pool),
        }
    }
}

/// SQL `LIMIT` takes a bigint.
fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl TriggerStore for PostgresTriggerStore {
    async fn insert(&self, record: PersistedJobRecord) -> Result<(), StoreError> {
        self.repo.insert(TriggerRow::from(record)).await?;
        Ok(())
    }

    async fn remove(&self, job_id: &JobId, job_group: &str) -> Result<bool, StoreError> {
        let deleted = self.repo.delete(job_id.as_str(), job_group).await?;
        Ok(deleted > 0)
    }

    async fn remove_group(&self, job_group: &str) -> Result<usize, StoreError> {
        Ok(self.repo.delete_group(job_group).await?)
    }

    async fn claim_due(
        &self,
        now: Timestamp,
        limit: usize,
    ) -> Result<Vec<PersistedJobRecord>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let rows = self.repo.claim_due(now, sql_limit(limit)).await?;
        Ok(rows.into_iter().map(PersistedJobRecord::from).collect())
    }

    async fn list(&self, job_group: Option<&str>) -> Result<Vec<PersistedJobRecord>, StoreError> {
        let rows = self.repo.list(job_group).await?;
        Ok(rows.into_iter().map(PersistedJobRecord::from).collect())
    }

    async fn count(&self, job_group: Option<&str>) -> Result<usize, StoreError> {
        let count = self.repo.count(job_group).await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_limit_saturates() {
        assert_eq!(sql_limit(100), 100);
        assert_eq!(sql_limit(usize::MAX), i64::MAX);
    }
}
