//! Durable trigger store on top of `cached`'s sled-backed disk cache.
//!
//! Every change is flushed before the call returns, so a record handed to
//! `insert` survives a crash right after. No lifespan is set on the cache:
//! records only leave through `remove`, `remove_group` or `claim_due`.
//!
//! A `(trigger time, job id)` index is rebuilt when the store opens and kept
//! in step with every write, so a poll only reads the records it claims.

use std::collections::BTreeMap;

use async_trait::async_trait;
use cached::IOCached;
use cached::stores::{DiskCache as CachedDiskCache, DiskCacheError};
use jiff::Timestamp;
use tokio::sync::Mutex;

use crate::config::DiskStoreConfig;
use crate::jobs::{JobId, PersistedJobRecord};
use crate::trigger::{StoreError, TriggerStore};

type Cache = CachedDiskCache<String, PersistedJobRecord>;

struct DiskState {
    cache: Cache,
    /// `(trigger_at, job_id)` -> job group
    index: BTreeMap<(Timestamp, String), String>,
}

pub struct DiskTriggerStore {
    state: Mutex<DiskState>,
}

fn op_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Operation(e.to_string())
}

impl DiskTriggerStore {
    pub fn new(config: &DiskStoreConfig) -> Result<Self, StoreError> {
        let cache = CachedDiskCache::new(&config.name)
            .set_disk_directory(&config.directory)
            .set_sync_to_disk_on_cache_change(true)
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let index = load_all(&cache)?
            .into_iter()
            .map(|r| ((r.trigger_at, r.job_id.to_string()), r.job_group))
            .collect::<BTreeMap<_, _>>();

        tracing::info!(
            directory = %config.directory,
            name = %config.name,
            scheduled = index.len(),
            "Disk trigger store opened"
        );

        Ok(Self {
            state: Mutex::new(DiskState { cache, index }),
        })
    }
}

/// Read every record, ordered by trigger time.
///
/// An entry that no longer decodes can never fire, so it is deleted here
/// with an error log instead of being skipped on every read.
fn load_all(cache: &Cache) -> Result<Vec<PersistedJobRecord>, StoreError> {
    let mut records = Vec::new();
    let mut unreadable = Vec::new();
    for key in cache.connection().iter().keys() {
        let key = String::from_utf8_lossy(&key.map_err(op_err)?).into_owned();
        match cache.cache_get(&key) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => {
                tracing::error!(job_id = %key, error = %e, "Dropping undecodable trigger record");
                unreadable.push(key);
            }
        }
    }

    if !unreadable.is_empty() {
        let db = cache.connection();
        for key in &unreadable {
            db.remove(key.as_bytes()).map_err(op_err)?;
        }
        db.flush().map_err(op_err)?;
    }

    records.sort_by(|a, b| {
        a.trigger_at
            .cmp(&b.trigger_at)
            .then_with(|| a.job_id.cmp(&b.job_id))
    });
    Ok(records)
}

#[async_trait]
impl TriggerStore for DiskTriggerStore {
    async fn insert(&self, record: PersistedJobRecord) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let entry = (
            (record.trigger_at, record.job_id.to_string()),
            record.job_group.clone(),
        );
        state
            .cache
            .cache_set(record.job_id.to_string(), record)
            .map_err(op_err)?;
        state.index.insert(entry.0, entry.1);
        Ok(())
    }

    async fn remove(&self, job_id: &JobId, job_group: &str) -> Result<bool, StoreError> {
        let key = job_id.to_string();
        let mut state = self.state.lock().await;

        let Some(record) = state.cache.cache_get(&key).map_err(op_err)? else {
            return Ok(false);
        };
        if record.job_group != job_group {
            return Ok(false);
        }

        let removed = state.cache.cache_remove(&key).map_err(op_err)?;
        state.index.remove(&(record.trigger_at, key));
        Ok(removed.is_some())
    }

    async fn remove_group(&self, job_group: &str) -> Result<usize, StoreError> {
        let mut state = self.state.lock().await;
        let doomed: Vec<(Timestamp, String)> = state
            .index
            .iter()
            .filter(|(_, group)| group.as_str() == job_group)
            .map(|(entry, _)| entry.clone())
            .collect();

        let mut removed = 0;
        for entry in doomed {
            let deleted = state.cache.cache_remove(&entry.1).map_err(op_err)?;
            state.index.remove(&entry);
            if deleted.is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn claim_due(
        &self,
        now: Timestamp,
        limit: usize,
    ) -> Result<Vec<PersistedJobRecord>, StoreError> {
        let mut state = self.state.lock().await;
        let due: Vec<(Timestamp, String)> = state
            .index
            .keys()
            .take_while(|(trigger_at, _)| *trigger_at <= now)
            .take(limit)
            .cloned()
            .collect();

        let mut claimed = Vec::with_capacity(due.len());
        for entry in due {
            let group = state.index.remove(&entry);
            match state.cache.cache_remove(&entry.1) {
                Ok(Some(record)) => claimed.push(record),
                Ok(None) => {}
                // Nothing was deleted, the record stays scheduled for the next poll
                Err(DiskCacheError::StorageError(e)) => {
                    tracing::warn!(job_id = %entry.1, error = %e, "Failed to claim trigger record");
                    if let Some(group) = group {
                        state.index.insert(entry, group);
                    }
                }
                Err(e) => {
                    tracing::error!(job_id = %entry.1, error = %e, "Dropping undecodable trigger record");
                }
            }
        }
        Ok(claimed)
    }

    async fn list(&self, job_group: Option<&str>) -> Result<Vec<PersistedJobRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(load_all(&state.cache)?
            .into_iter()
            .filter(|r| job_group.is_none_or(|g| r.job_group == g))
            .collect())
    }

    async fn count(&self, job_group: Option<&str>) -> Result<usize, StoreError> {
        let state = self.state.lock().await;
        Ok(match job_group {
            Some(g) => state.index.values().filter(|group| group.as_str() == g).count(),
            None => state.index.len(),
        })
    }

    fn backend_name(&self) -> &'static str {
        "disk"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;
    use tempfile::tempdir;

    fn config(dir: &tempfile::TempDir, name: &str) -> DiskStoreConfig {
        DiskStoreConfig {
            directory: dir.path().to_str().unwrap().to_string(),
            name: name.to_string(),
        }
    }

    fn record(group: &str, trigger_at: Timestamp) -> PersistedJobRecord {
        PersistedJobRecord {
            job_id: JobId::generate(),
            job_group: group.to_string(),
            job_name: "disk-test".to_string(),
            trigger_at,
            serialized_payload: "{\"n\":1}".to_string(),
            type_tag: "test".to_string(),
            scheduled_at: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_list_and_remove() {
        let dir = tempdir().unwrap();
        let store = DiskTriggerStore::new(&config(&dir, "insert_list")).unwrap();
        let r = record("g", Timestamp::now() + SignedDuration::from_secs(60));
        store.insert(r.clone()).await.unwrap();

        assert_eq!(store.list(Some("g")).await.unwrap(), vec![r.clone()]);
        assert!(store.list(Some("other")).await.unwrap().is_empty());
        assert!(!store.remove(&r.job_id, "other").await.unwrap());
        assert!(store.remove(&r.job_id, "g").await.unwrap());
        assert_eq!(store.count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempdir().unwrap();
        let cfg = config(&dir, "reopen");
        let now = Timestamp::now();
        let due = record("g", now + SignedDuration::from_millis(200));
        let later = record("g", now + SignedDuration::from_secs(3600));
        {
            let store = DiskTriggerStore::new(&cfg).unwrap();
            store.insert(due.clone()).await.unwrap();
            store.insert(later.clone()).await.unwrap();
        }

        // Let the first record come due while the store is closed.
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;

        let reopened = DiskTriggerStore::new(&cfg).unwrap();
        assert_eq!(reopened.count(None).await.unwrap(), 2);
        let claimed = reopened.claim_due(Timestamp::now(), 10).await.unwrap();
        assert_eq!(claimed, vec![due]);
        assert_eq!(reopened.list(None).await.unwrap(), vec![later]);
    }

    #[tokio::test]
    async fn test_remove_group_leaves_other_groups() {
        let dir = tempdir().unwrap();
        let store = DiskTriggerStore::new(&config(&dir, "groups")).unwrap();
        let now = Timestamp::now();
        store.insert(record("a", now)).await.unwrap();
        store.insert(record("a", now)).await.unwrap();
        store.insert(record("b", now)).await.unwrap();

        assert_eq!(store.remove_group("a").await.unwrap(), 2);
        assert_eq!(store.count(Some("a")).await.unwrap(), 0);
        assert_eq!(store.count(Some("b")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_record_is_dropped_once_on_open() {
        let dir = tempdir().unwrap();
        let cfg = config(&dir, "undecodable");
        {
            let foreign: CachedDiskCache<String, String> = CachedDiskCache::new(&cfg.name)
                .set_disk_directory(&cfg.directory)
                .set_sync_to_disk_on_cache_change(true)
                .build()
                .unwrap();
            foreign
                .cache_set("broken".to_string(), "not a record".to_string())
                .unwrap();
        }

        let store = DiskTriggerStore::new(&cfg).unwrap();
        let good = record("g", Timestamp::now() - SignedDuration::from_secs(1));
        store.insert(good.clone()).await.unwrap();

        assert_eq!(store.count(None).await.unwrap(), 1);
        assert_eq!(store.claim_due(Timestamp::now(), 10).await.unwrap(), vec![good]);
        let state = store.state.lock().await;
        assert!(!state.cache.connection().contains_key("broken").unwrap());
    }

    #[tokio::test]
    async fn test_index_follows_reopen_and_claims_in_time_order() {
        let dir = tempdir().unwrap();
        let cfg = config(&dir, "index");
        let now = Timestamp::now();
        let first = record("g", now - SignedDuration::from_secs(30));
        let second = record("h", now - SignedDuration::from_secs(10));
        let future = record("g", now + SignedDuration::from_secs(600));
        {
            let store = DiskTriggerStore::new(&cfg).unwrap();
            for r in [future.clone(), second.clone(), first.clone()] {
                store.insert(r).await.unwrap();
            }
        }

        let store = DiskTriggerStore::new(&cfg).unwrap();
        assert_eq!(store.count(Some("g")).await.unwrap(), 2);
        assert_eq!(store.claim_due(now, 1).await.unwrap(), vec![first]);
        assert_eq!(store.claim_due(now, 10).await.unwrap(), vec![second]);
        assert!(store.claim_due(now, 10).await.unwrap().is_empty());
        assert_eq!(store.count(None).await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_remove_racing_claim_has_exactly_one_winner() {
        use std::collections::HashSet;
        use std::sync::Arc;

        let dir = tempdir().unwrap();
        let store = Arc::new(DiskTriggerStore::new(&config(&dir, "race")).unwrap());
        let past = Timestamp::now() - SignedDuration::from_secs(1);
        let mut ids = Vec::new();
        for _ in 0..40 {
            let r = record("race", past);
            ids.push(r.job_id.clone());
            store.insert(r).await.unwrap();
        }

        let claimer = {
            let store = store.clone();
            tokio::spawn(async move {
                let mut claimed = HashSet::new();
                loop {
                    let batch = store.claim_due(Timestamp::now(), 2).await.unwrap();
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
