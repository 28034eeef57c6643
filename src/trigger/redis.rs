//! Redis trigger store using a bb8 connection pool.
//!
//! Key layout under `{prefix}`:
//! - `{prefix}:triggers` sorted set, member = job id, score = trigger time in ms
//! - `{prefix}:job:{id}` JSON encoded record
//! - `{prefix}:group:{group}` set of job ids in the group
//!
//! Taking a record runs as one Lua script: whoever gets `1` back from `ZREM`
//! deletes the record key and its group membership in the same step and gets
//! the encoded record back.

use std::collections::HashSet;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use jiff::Timestamp;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisError, Script};

use crate::config::RedisStoreConfig;
use crate::jobs::{JobId, PersistedJobRecord};
use crate::trigger::{StoreError, TriggerStore, round_up};

type RedisPool = Pool<Client>;

/// Scores are whole milliseconds.
const MILLISECOND_NANOS: i32 = 1_000_000;

/// KEYS: triggers zset, record key. ARGV: job id, group key prefix.
const TAKE_SCRIPT: &str = r"
if redis.call('ZREM', KEYS[1], ARGV[1]) == 0 then
    return false
end
local raw = redis.call('GET', KEYS[2])
redis.call('DEL', KEYS[2])
if not raw then
    return false
end
local ok, record = pcall(cjson.decode, raw)
if ok and type(record) == 'table' and type(record['job_group']) == 'string' then
    redis.call('SREM', ARGV[2] .. record['job_group'], ARGV[1])
end
return raw
";

pub struct RedisTriggerStore {
    pool: RedisPool,
    keys: KeyLayout,
    take_script: Script,
}

struct KeyLayout {
    prefix: String,
}

impl KeyLayout {
    fn triggers(&self) -> String {
        format!("{}:triggers", self.prefix)
    }

    fn job(&self, job_id: &str) -> String {
        format!("{}:job:{}", self.prefix, job_id)
    }

    fn group_prefix(&self) -> String {
        format!("{}:group:", self.prefix)
    }

    fn group(&self, job_group: &str) -> String {
        format!("{}{}", self.group_prefix(), job_group)
    }
}

/// Sorted-set score for a trigger time, rounded up so a job never scores
/// earlier than it is due.
fn score(trigger_at: Timestamp) -> i64 {
    round_up(trigger_at, MILLISECOND_NANOS).as_millisecond()
}

fn op_err(e: RedisError) -> StoreError {
    StoreError::Operation(e.to_string())
}

impl RedisTriggerStore {
    pub async fn new(config: &RedisStoreConfig) -> Result<Self, StoreError> {
        let client =
            Client::open(config.url.as_str()).map_err(|e| StoreError::Connection(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(std::time::Duration::from_secs(config.connection_timeout))
            .build(client)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        tracing::info!(key_prefix = %config.key_prefix, "Redis trigger store connected");

        Ok(Self {
            pool,
            keys: KeyLayout {
                prefix: config.key_prefix.clone(),
            },
            take_script: Script::new(TAKE_SCRIPT),
        })
    }

    async fn get_conn(&self) -> Result<PooledConnection<'_, Client>, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    /// Take ownership of one record. `None` when somebody else got there first.
    ///
    /// A record that was taken but no longer decodes is dropped with an error
    /// log; it is already gone from every key.
    async fn take(
        &self,
        conn: &mut MultiplexedConnection,
        job_id: &str,
    ) -> Result<Option<PersistedJobRecord>, StoreError> {
        let raw: Option<String> = self
            .take_script
            .key(self.keys.triggers())
            .key(self.keys.job(job_id))
            .arg(job_id)
            .arg(self.keys.group_prefix())
            .invoke_async(conn)
            .await
            .map_err(op_err)?;
        let Some(raw) = raw else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::error!(job_id, error = %e, "Dropping undecodable trigger record");
                Ok(None)
            }
        }
    }

    async fn load(
        &self,
        conn: &mut MultiplexedConnection,
        ids: Vec<String>,
    ) -> Result<Vec<PersistedJobRecord>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let job_keys: Vec<String> = ids.iter().map(|id| self.keys.job(id)).collect();
        let raws: Vec<Option<String>> = conn.mget(&job_keys).await.map_err(op_err)?;

        let mut records = Vec::with_capacity(raws.len());
        for raw in raws.into_iter().flatten() {
            records.push(serde_json::from_str::<PersistedJobRecord>(&raw)?);
        }
        records.sort_by(|a, b| {
            a.trigger_at
                .cmp(&b.trigger_at)
                .then_with(|| a.job_id.cmp(&b.job_id))
        });
        Ok(records)
    }
}

#[async_trait]
impl TriggerStore for RedisTriggerStore {
    async fn insert(&self, record: PersistedJobRecord) -> Result<(), StoreError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let raw = serde_json::to_string(&record)?;
        let job_id = record.job_id.as_str();

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        redis::pipe()
            .atomic()
            .set(self.keys.job(job_id), raw)
            .ignore()
            .zadd(self.keys.triggers(), job_id, score(record.trigger_at))
            .ignore()
            .sadd(self.keys.group(&record.job_group), job_id)
            .ignore()
            .query_async::<()>(conn_ref)
            .await
            .map_err(op_err)
    }

    async fn remove(&self, job_id: &JobId, job_group: &str) -> Result<bool, StoreError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;

        let member: bool = conn_ref
            .sismember(self.keys.group(job_group), job_id.as_str())
            .await
            .map_err(op_err)?;
        if !member {
            return Ok(false);
        }
        Ok(self.take(conn_ref, job_id.as_str()).await?.is_some())
    }

    async fn remove_group(&self, job_group: &str) -> Result<usize, StoreError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;

        let ids: HashSet<String> = conn_ref
            .smembers(self.keys.group(job_group))
            .await
            .map_err(op_err)?;

        let mut removed = 0;
        for id in ids {
            if self.take(conn_ref, &id).await?.is_some() {
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
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;

        let count = isize::try_from(limit).unwrap_or(isize::MAX);
        let ids: Vec<String> = conn_ref
            .zrangebyscore_limit(self.keys.triggers(), "-inf", now.as_millisecond(), 0, count)
            .await
            .map_err(op_err)?;

        let mut claimed = Vec::with_capacity(ids.len());
        for id in ids {
            match self.take(conn_ref, &id).await {
                Ok(Some(record)) => claimed.push(record),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(job_id = %id, error = %e, "Failed to claim trigger record");
                    // Hand over what is already claimed; the rest waits for the next poll
                    if claimed.is_empty() {
                        return Err(e);
                    }
                    break;
                }
            }
        }
        Ok(claimed)
    }

    async fn list(&self, job_group: Option<&str>) -> Result<Vec<PersistedJobRecord>, StoreError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;

        let ids: Vec<String> = match job_group {
            Some(group) => {
                let members: HashSet<String> = conn_ref
                    .smembers(self.keys.group(group))
                    .await
                    .map_err(op_err)?;
                members.into_iter().collect()
            }
            None => conn_ref
                .zrange(self.keys.triggers(), 0, -1)
                .await
                .map_err(op_err)?,
        };

        self.load(conn_ref, ids).await
    }

    async fn count(&self, job_group: Option<&str>) -> Result<usize, StoreError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;

        let count: usize = match job_group {
            Some(group) => conn_ref
                .scard(self.keys.group(group))
                .await
                .map_err(op_err)?,
            None => conn_ref
                .zcard(self.keys.triggers())
                .await
                .map_err(op_err)?,
        };
        Ok(count)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
