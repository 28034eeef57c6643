//! In-process trigger store backed by DashMap.
//!
//! Not durable. Meant for tests and for embedding where losing pending jobs on
//! restart is acceptable.

use async_trait::async_trait;
use dashmap::DashMap;
use jiff::Timestamp;

use crate::jobs::{JobId, PersistedJobRecord};
use crate::trigger::{StoreError, TriggerStore};

#[derive(Default)]
pub struct MemoryTriggerStore {
    records: DashMap<JobId, PersistedJobRecord>,
}

impl MemoryTriggerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(mut records: Vec<PersistedJobRecord>) -> Vec<PersistedJobRecord> {
        records.sort_by(|a, b| {
            a.trigger_at
                .cmp(&b.trigger_at)
                .then_with(|| a.job_id.cmp(&b.job_id))
        });
        records
    }
}

#[async_trait]
impl TriggerStore for MemoryTriggerStore {
    async fn insert(&self, record: PersistedJobRecord) -> Result<(), StoreError> {
        self.records.insert(record.job_id.clone(), record);
        Ok(())
    }

    async fn remove(&self, job_id: &JobId, job_group: &str) -> Result<bool, StoreError> {
        Ok(self
            .records
            .remove_if(job_id, |_, record| record.job_group == job_group)
            .is_some())
    }

    async fn remove_group(&self, job_group: &str) -> Result<usize, StoreError> {
        let ids: Vec<JobId> = self
            .records
            .iter()
            .filter(|entry| entry.job_group == job_group)
            .map(|entry| entry.key().clone())
            .collect();

        Ok(ids
            .iter()
            .filter(|id| self.records.remove(*id).is_some())
            .count())
    }

    async fn claim_due(
        &self,
        now: Timestamp,
        limit: usize,
    ) -> Result<Vec<PersistedJobRecord>, StoreError> {
        let due = Self::sorted(
            self.records
                .iter()
                .filter(|entry| entry.is_due(now))
                .map(|entry| entry.value().clone())
                .collect(),
        );

        // Only the caller whose remove() succeeds owns the record.
        Ok(due
            .into_iter()
            .filter_map(|record| self.records.remove(&record.job_id).map(|(_, r)| r))
            .take(limit)
            .collect())
    }

    async fn list(&self, job_group: Option<&str>) -> Result<Vec<PersistedJobRecord>, StoreError> {
        Ok(Self::sorted(
            self.records
                .iter()
                .filter(|entry| job_group.is_none_or(|g| entry.job_group == g))
                .map(|entry| entry.value().clone())
                .collect(),
        ))
    }

    async fn count(&self, job_group: Option<&str>) -> Result<usize, StoreError> {
        Ok(match job_group {
            None => self.records.len(),
            Some(g) => self.records.iter().filter(|e| e.job_group == g).count(),
        })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn record(group: &str, trigger_at: Timestamp) -> PersistedJobRecord {
        PersistedJobRecord {
            job_id: JobId::generate(),
            job_group: group.to_string(),
            job_name: "test".to_string(),
            trigger_at,
            serialized_payload: "{}".to_string(),
            type_tag: "test".to_string(),
            scheduled_at: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn test_claim_due_respects_time_order_and_limit() {
        let store = MemoryTriggerStore::new();
        let now = Timestamp::now();
        let late = record("g", now - SignedDuration::from_secs(1));
        let early = record("g", now - SignedDuration::from_secs(10));
        let future = record("g", now + SignedDuration::from_secs(60));
        for r in [late.clone(), early.clone(), future.clone()] {
            store.insert(r).await.unwrap();
        }

        let first = store.claim_due(now, 1).await.unwrap();
        assert_eq!(first, vec![early]);
        let second = store.claim_due(now, 10).await.unwrap();
        assert_eq!(second, vec![late]);
        assert!(store.claim_due(now, 10).await.unwrap().is_empty());
        assert_eq!(store.list(None).await.unwrap(), vec![future]);
    }

    #[tokio::test]
    async fn test_remove_requires_matching_group() {
        let store = MemoryTriggerStore::new();
        let r = record("alpha", Timestamp::now());
        store.insert(r.clone()).await.unwrap();

        assert!(!store.remove(&r.job_id, "beta").await.unwrap());
        assert!(store.remove(&r.job_id, "alpha").await.unwrap());
        assert!(!store.remove(&r.job_id, "alpha").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_group_scope() {
        let store = MemoryTriggerStore::new();
        let now = Timestamp::now();
        for _ in 0..3 {
            store.insert(record("doomed", now)).await.unwrap();
        }
        store.insert(record("kept", now)).await.unwrap();

        assert_eq!(store.remove_group("doomed").await.unwrap(), 3);
        assert_eq!(store.remove_group("doomed").await.unwrap(), 0);
        assert_eq!(store.count(None).await.unwrap(), 1);
        assert_eq!(store.count(Some("kept")).await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_claims_never_share_a_record() {
        let store = Arc::new(MemoryTriggerStore::new());
        let past = Timestamp::now() - SignedDuration::from_secs(5);
        for _ in 0..200 {
            store.insert(record("g", past)).await.unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut claimed = Vec::new();
                loop {
                    let batch = store.claim_due(Timestamp::now(), 7).await.unwrap();
                    if batch.is_empty() {
                        break;
                    }
                    claimed.extend(batch.into_iter().map(|r| r.job_id));
                }
                claimed
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.await.unwrap() {
                assert!(seen.insert(id), "record claimed twice");
            }
        }
        assert_eq!(seen.len(), 200);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_remove_racing_claim_has_exactly_one_winner() {
        let store = Arc::new(MemoryTriggerStore::new());
        let past = Timestamp::now() - SignedDuration::from_secs(1);
        let mut ids = Vec::new();
        for _ in 0..100 {
            let r = record("race", past);
            ids.push(r.job_id.clone());
            store.insert(r).await.unwrap();
        }

        let claimer = {
            let store = store.clone();
            tokio::spawn(async move {
                let mut claimed = HashSet::new();
                loop {
                    let batch = store.claim_due(Timestamp::now(), 3).await.unwrap();
                    if batch.is_empty() {
                        break;
                    }
                    claimed.extend(batch.into_iter().map(|r| r.job_id));
                }
                claimed
            })
        };
        let remover = {
            let store = store.clone();
            let ids = ids.clone();
            tokio::spawn(async move {
                let mut removed = HashSet::new();
                for id in ids.into_iter().rev() {
                    if store.remove(&id, "race").await.unwrap() {
                        removed.insert(id);
                    }
                }
                removed
            })
        };

        let claimed = claimer.await.unwrap();
        let removed = remover.await.unwrap();
        assert!(claimed.is_disjoint(&removed));
        assert_eq!(claimed.len() + removed.len(), ids.len());
        assert_eq!(store.count(None).await.unwrap(), 0);
    }
}
