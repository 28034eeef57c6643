//! Persistent one-shot jobs
//!
//! Callers build a [`Job`] and hand it to [`JobScheduler::schedule`]. The
//! payload is serialized through the [`CodecRegistry`] and stored with a type
//! tag. When the job falls due the [`JobRunner`] claims it and the
//! [`JobDispatcher`] uses the [`DispatchRegistry`] to find the deserializer
//! and [`JobExecutor`] for that tag.

pub mod codec;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod models;
pub mod registry;
pub mod remover;
pub mod runner;
pub mod scheduler;

pub use codec::{JobPayloadDeserializer, JobPayloadSerializer, JsonPayloadCodec, StringPayloadCodec};
pub use dispatcher::{DispatchOutcome, JobDispatcher};
pub use error::{JobError, JobResult};
pub use executor::{InFlightTracker, JobExecutor};
pub use models::{Job, JobId, PersistedJobRecord};
pub use registry::{CodecRegistry, DispatchRegistry};
pub use remover::JobRemover;
pub use runner::JobRunner;
pub use scheduler::JobScheduler;
