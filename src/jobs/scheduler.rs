use std::sync::Arc;

use jiff::Timestamp;

use crate::jobs::error::{JobError, JobResult};
use crate::jobs::models::{Job, JobId, PersistedJobRecord};
use crate::jobs::registry::CodecRegistry;
use crate::trigger::TriggerStore;

/// Longest group or name the postgres schema accepts
const MAX_LABEL_LEN: usize = 255;

/// Entry point for scheduling deferred work
///
/// Cloning is cheap; every clone shares the same store and codec registry.
#[derive(Clone)]
pub struct JobScheduler {
    store: Arc<dyn TriggerStore>,
    codecs: Arc<CodecRegistry>,
}

impl JobScheduler {
    pub fn new(store: Arc<dyn TriggerStore>, codecs: Arc<CodecRegistry>) -> Self {
        Self { store, codecs }
    }

    /// Persist `job` and return the id needed to remove it later
    ///
    /// Returns only after the store has accepted the record. A trigger time in
    /// the past is accepted and fires on the next runner poll.
    ///
    /// # Errors
    /// - `JobError::Validation` for an empty or oversized group or name
    /// - `JobError::NoCodec` when no codec is registered for `T`; nothing is persisted
    /// - `JobError::Serialization` when the codec rejects the payload
    /// - `JobError::Store` when the backend write fails
    pub async fn schedule<T: 'static>(&self, job: Job<T>) -> JobResult<JobId> {
        let record = self.prepare(job)?;
        let job_id = record.job_id.clone();
        let job_group = record.job_group.clone();
        let trigger_at = record.trigger_at;

        self.store.insert(record).await?;

        tracing::info!(
            job_id = %job_id,
            job_group = %job_group,
            trigger_at = %trigger_at,
            backend = self.store.backend_name(),
            "Job scheduled"
        );
        Ok(job_id)
    }

    fn prepare<T: 'static>(&self, job: Job<T>) -> JobResult<PersistedJobRecord> {
        validate_label("job_group", job.group())?;
        validate_label("job_name", job.name())?;

        let (type_tag, serializer) = self.codecs.lookup::<T>()?;
        let serialized_payload =
            serializer
                .serialize(job.payload())
                .map_err(|source| JobError::Serialization {
                    payload_type: std::any::type_name::<T>(),
                    source,
                })?;

        let type_tag = type_tag.to_string();
        let (job_group, job_name, _payload, trigger_at) = job.into_parts();
        Ok(PersistedJobRecord {
            job_id: JobId::generate(),
            job_group,
            job_name,
            trigger_at,
            serialized_payload,
            type_tag,
            scheduled_at: Timestamp::now(),
        })
    }
}

fn validate_label(field: &str, value: &str) -> JobResult<()> {
    if value.trim().is_empty() {
        return Err(JobError::validation(field, "must not be empty"));
    }
    if value.len() > MAX_LABEL_LEN {
        return Err(JobError::validation(
            field,
            format!("must be at most {MAX_LABEL_LEN} bytes"),
        ));
    }
    Ok(())
}
