use thiserror::Error;

use crate::trigger::StoreError;

/// Errors raised while scheduling, removing or dispatching jobs
#[derive(Debug, Error)]
pub enum JobError {
    #[error("No payload codec registered for type {payload_type}")]
    NoCodec { payload_type: &'static str },

    #[error("No dispatch mapping matches type tag '{type_tag}'")]
    NoDispatch { type_tag: String },

    #[error("Failed to serialize payload of type {payload_type}")]
    Serialization {
        payload_type: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to deserialize payload with type tag '{type_tag}'")]
    Deserialization {
        type_tag: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Job execution failed")]
    Execution {
        #[source]
        source: anyhow::Error,
    },

    #[error("Trigger store error: {0}")]
    Store(#[from] StoreError),

    #[error("Job runner error")]
    Runner {
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid job {field}: {reason}")]
    Validation { field: String, reason: String },
}

impl JobError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Configuration mistakes that no amount of retrying will fix
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::NoCodec { .. } | Self::NoDispatch { .. })
    }
}

pub type JobResult<T> = Result<T, JobError>;
