//! Type registries
//!
//! [`CodecRegistry`] answers "how do I persist a `T`" at schedule time.
//! [`DispatchRegistry`] answers "who handles this type tag" at fire time,
//! when the payload type is long gone and only the tag survives.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::jobs::codec::{JobPayloadDeserializer, JobPayloadSerializer};
use crate::jobs::error::{JobError, JobResult};
use crate::jobs::executor::JobExecutor;
use crate::jobs::models::PersistedJobRecord;

struct CodecEntry<T> {
    type_tag: String,
    serializer: Arc<dyn JobPayloadSerializer<T>>,
}

/// Payload type to `(type_tag, serializer)` map
#[derive(Default)]
pub struct CodecRegistry {
    entries: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the serializer for payload type `T`
    ///
    /// `type_tag` is what gets persisted with each job and later matched by
    /// the dispatch registry. Registering `T` again replaces the entry.
    pub fn register<T, S>(&mut self, type_tag: impl Into<String>, serializer: S) -> &mut Self
    where
        T: 'static,
        S: JobPayloadSerializer<T> + 'static,
    {
        let entry = CodecEntry::<T> {
            type_tag: type_tag.into(),
            serializer: Arc::new(serializer),
        };
        self.entries.insert(TypeId::of::<T>(), Box::new(entry));
        self
    }

    /// Resolve the codec for exactly `T`
    ///
    /// # Errors
    /// `JobError::NoCodec` when nothing is registered for `T`.
    pub fn lookup<T: 'static>(&self) -> JobResult<(&str, &dyn JobPayloadSerializer<T>)> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<CodecEntry<T>>())
            .map(|entry| (entry.type_tag.as_str(), entry.serializer.as_ref()))
            .ok_or(JobError::NoCodec {
                payload_type: type_name::<T>(),
            })
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Deserialize-then-execute for one payload type, with the type erased
#[async_trait]
pub(crate) trait ErasedHandler: Send + Sync {
    async fn handle(&self, record: &PersistedJobRecord) -> JobResult<()>;
}

struct TypedHandler<T> {
    deserializer: Arc<dyn JobPayloadDeserializer<T>>,
    executor: Arc<dyn JobExecutor<T>>,
}

#[async_trait]
impl<T> ErasedHandler for TypedHandler<T>
where
    T: Send + 'static,
{
    async fn handle(&self, record: &PersistedJobRecord) -> JobResult<()> {
        let payload = self
            .deserializer
            .deserialize(&record.serialized_payload)
            .map_err(|source| JobError::Deserialization {
                type_tag: record.type_tag.clone(),
                source,
            })?;

        self.executor
            .execute(
                &record.job_id,
                &record.job_group,
                &record.job_name,
                payload,
            )
            .await
            .map_err(|source| JobError::Execution { source })
    }
}

type TagPredicate = Box<dyn Fn(&str) -> bool + Send + Sync>;

struct DispatchEntry {
    predicate: TagPredicate,
    handler: Arc<dyn ErasedHandler>,
}

/// Ordered `predicate(type_tag) -> (deserializer, executor)` mappings
///
/// Entries are tried in registration order and the first match wins.
#[derive(Default)]
pub struct DispatchRegistry {
    entries: Vec<DispatchEntry>,
}

impl DispatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T, P, D, E>(&mut self, predicate: P, deserializer: D, executor: E) -> &mut Self
    where
        T: Send + 'static,
        P: Fn(&str) -> bool + Send + Sync + 'static,
        D: JobPayloadDeserializer<T> + 'static,
        E: JobExecutor<T> + 'static,
    {
        self.register_shared(predicate, Arc::new(deserializer), Arc::new(executor))
    }

    /// Same as [`register`](Self::register) for executors shared between
    /// several mappings
    pub fn register_shared<T, P>(
        &mut self,
        predicate: P,
        deserializer: Arc<dyn JobPayloadDeserializer<T>>,
        executor: Arc<dyn JobExecutor<T>>,
    ) -> &mut Self
    where
        T: Send + 'static,
        P: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.entries.push(DispatchEntry {
            predicate: Box::new(predicate),
            handler: Arc::new(TypedHandler {
                deserializer,
                executor,
            }),
        });
        self
    }

    /// Map one exact type tag
    pub fn register_tag<T, D, E>(
        &mut self,
        type_tag: impl Into<String>,
        deserializer: D,
        executor: E,
    ) -> &mut Self
    where
        T: Send + 'static,
        D: JobPayloadDeserializer<T> + 'static,
        E: JobExecutor<T> + 'static,
    {
        let expected = type_tag.into();
        self.register(move |tag: &str| tag == expected, deserializer, executor)
    }

    pub(crate) fn resolve(&self, type_tag: &str) -> JobResult<Arc<dyn ErasedHandler>> {
        self.entries
            .iter()
            .find(|entry| (entry.predicate)(type_tag))
            .map(|entry| Arc::clone(&entry.handler))
            .ok_or_else(|| JobError::NoDispatch {
                type_tag: type_tag.to_string(),
            })
    }

    pub fn matches(&self, type_tag: &str) -> bool {
        self.entries.iter().any(|entry| (entry.predicate)(type_tag))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
