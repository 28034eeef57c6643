//! Routes fired records to their executors.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::jobs::error::JobError;
use crate::jobs::models::PersistedJobRecord;
use crate::jobs::registry::DispatchRegistry;

/// What happened to one fired record
///
/// Every outcome consumes the record; none of them puts it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Completed,
    ExecutionFailed,
    DeserializationFailed,
    Unroutable,
}

#[derive(Clone)]
pub struct JobDispatcher {
    registry: Arc<DispatchRegistry>,
}

impl JobDispatcher {
    pub fn new(registry: Arc<DispatchRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve, deserialize and execute one record
    ///
    /// Failures and panics are logged and turned into an outcome so that one
    /// bad job never takes the runner down with it.
    pub async fn dispatch(&self, record: PersistedJobRecord) -> DispatchOutcome {
        let handler = match self.registry.resolve(&record.type_tag) {
            Ok(handler) => handler,
            Err(e) => {
                tracing::error!(
                    job_id = %record.job_id,
                    job_group = %record.job_group,
                    job_name = %record.job_name,
                    type_tag = %record.type_tag,
                    error = %e,
                    "No executor registered for job, dropping it"
                );
                return DispatchOutcome::Unroutable;
            }
        };

        tracing::debug!(
            job_id = %record.job_id,
            job_group = %record.job_group,
            job_name = %record.job_name,
            type_tag = %record.type_tag,
            "Executing job"
        );

        let result = AssertUnwindSafe(handler.handle(&record))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(JobError::Execution {
                    source: anyhow::anyhow!("executor panicked: {}", panic_message(&*panic)),
                })
            });

        match result {
            Ok(()) => {
                tracing::info!(
                    job_id = %record.job_id,
                    job_group = %record.job_group,
                    job_name = %record.job_name,
                    "Job completed"
                );
                DispatchOutcome::Completed
            }
            Err(e @ JobError::Deserialization { .. }) => {
                tracing::error!(
                    job_id = %record.job_id,
                    job_group = %record.job_group,
                    job_name = %record.job_name,
                    type_tag = %record.type_tag,
                    error = %format!("{:#}", anyhow::Error::from(e)),
                    "Failed to deserialize job payload, dropping it"
                );
                DispatchOutcome::DeserializationFailed
            }
            Err(e) => {
                tracing::error!(
                    job_id = %record.job_id,
                    job_group = %record.job_group,
                    job_name = %record.job_name,
                    type_tag = %record.type_tag,
                    error = %format!("{:#}", anyhow::Error::from(e)),
                    "Job execution failed"
                );
                DispatchOutcome::ExecutionFailed
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::codec::{JsonPayloadCodec, StringPayloadCodec};
    use crate::jobs::executor::JobExecutor;
    use crate::jobs::models::JobId;
    use async_trait::async_trait;
    use jiff::Timestamp;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Behaviour {
        Succeed,
        Fail,
        Panic,
    }

    struct Scripted {
        behaviour: Behaviour,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl JobExecutor<String> for Scripted {
        async fn execute(
            &self,
            _job_id: &JobId,
            _job_group: &str,
            _job_name: &str,
            _payload: String,
        ) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Succeed => Ok(()),
                Behaviour::Fail => anyhow::bail!("downstream unavailable"),
                Behaviour::Panic => panic!("executor blew up"),
            }
        }
    }

    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl JobExecutor<u32> for Counting {
        async fn execute(
            &self,
            _job_id: &JobId,
            _job_group: &str,
            _job_name: &str,
            _payload: u32,
        ) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn record(type_tag: &str, payload: &str) -> PersistedJobRecord {
        let now = Timestamp::now();
        PersistedJobRecord {
            job_id: JobId::from(format!("{type_tag}-id")),
            job_group: "group".to_string(),
            job_name: "name".to_string(),
            trigger_at: now,
            serialized_payload: payload.to_string(),
            type_tag: type_tag.to_string(),
            scheduled_at: now,
        }
    }

    fn dispatcher(calls: &Arc<AtomicUsize>) -> JobDispatcher {
        let mut registry = DispatchRegistry::new();
        for (tag, behaviour) in [
            ("ok", Behaviour::Succeed),
            ("fail", Behaviour::Fail),
            ("panic", Behaviour::Panic),
        ] {
            registry.register_tag(
                tag,
                StringPayloadCodec,
                Scripted {
                    behaviour,
                    calls: Arc::clone(calls),
                },
            );
        }
        registry.register_tag(
            "number",
            JsonPayloadCodec::<u32>::new(),
            Counting {
                calls: Arc::clone(calls),
            },
        );
        JobDispatcher::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_dispatch_outcomes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = dispatcher(&calls);

        assert_eq!(
            dispatcher.dispatch(record("ok", "a")).await,
            DispatchOutcome::Completed
        );
        assert_eq!(
            dispatcher.dispatch(record("fail", "b")).await,
            DispatchOutcome::ExecutionFailed
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dispatch_survives_panicking_executor() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = dispatcher(&calls);

        assert_eq!(
            dispatcher.dispatch(record("panic", "c")).await,
            DispatchOutcome::ExecutionFailed
        );
        assert_eq!(
            dispatcher.dispatch(record("ok", "d")).await,
            DispatchOutcome::Completed
        );
    }

    #[tokio::test]
    async fn test_dispatch_unroutable_and_undecodable() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = dispatcher(&calls);

        assert_eq!(
            dispatcher.dispatch(record("mystery", "e")).await,
            DispatchOutcome::Unroutable
        );
        assert_eq!(
            dispatcher.dispatch(record("number", "\"seven\"")).await,
            DispatchOutcome::DeserializationFailed
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_panic_message_variants() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(&*boxed), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*boxed), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&*boxed), "non-string panic payload");
    }
}
