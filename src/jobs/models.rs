use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One deferred unit of work
///
/// Immutable once built; the scheduler consumes it through [`Job::into_parts`].
#[derive(Debug, Clone, PartialEq)]
pub struct Job<T> {
    group: String,
    name: String,
    payload: T,
    trigger_at: Timestamp,
}

impl<T> Job<T> {
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        payload: T,
        trigger_at: Timestamp,
    ) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            payload,
            trigger_at,
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn trigger_at(&self) -> Timestamp {
        self.trigger_at
    }

    /// Split into `(group, name, payload, trigger_at)`
    pub fn into_parts(self) -> (String, String, T, Timestamp) {
        (self.group, self.name, self.payload, self.trigger_at)
    }
}

/// Opaque handle returned by `schedule()`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a trigger store holds for one scheduled job
///
/// The payload is already serialized and `type_tag` is the only hint about
/// how to read it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedJobRecord {
    pub job_id: JobId,
    pub job_group: String,
    pub job_name: String,
    pub trigger_at: Timestamp,
    pub serialized_payload: String,
    pub type_tag: String,
    pub scheduled_at: Timestamp,
}

impl PersistedJobRecord {
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.trigger_at <= now
    }
}
