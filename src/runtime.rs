//! Wiring for an embedded job runtime
//!
//! ```ignore
//! let mut codecs = CodecRegistry::new();
//! codecs.register::<Reminder, _>("reminder", JsonPayloadCodec::new());
//! let mut dispatch = DispatchRegistry::new();
//! dispatch.register_tag("reminder", JsonPayloadCodec::<Reminder>::new(), ReminderExecutor);
//!
//! let runtime = JobRuntime::builder(settings.scheduler)
//!     .database(settings.database)
//!     .codecs(codecs)
//!     .dispatch(dispatch)
//!     .build()
//!     .await?;
//! runtime.start().await?;
//! ```

use std::sync::Arc;

use crate::config::{DatabaseConfig, SchedulerConfig};
use crate::jobs::{
    CodecRegistry, DispatchRegistry, JobDispatcher, JobError, JobRemover, JobResult, JobRunner,
    JobScheduler,
};
use crate::services::JobService;
use crate::trigger::{TriggerStore, build_trigger_store};

/// Builder for [`JobRuntime`]. Registries are frozen once `build` runs.
pub struct JobRuntimeBuilder {
    scheduler: SchedulerConfig,
    database: DatabaseConfig,
    codecs: CodecRegistry,
    dispatch: DispatchRegistry,
    store: Option<Arc<dyn TriggerStore>>,
}

impl JobRuntimeBuilder {
    pub fn database(mut self, database: DatabaseConfig) -> Self {
        self.database = database;
        self
    }

    pub fn codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = codecs;
        self
    }

    pub fn dispatch(mut self, dispatch: DispatchRegistry) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Use an existing store instead of building one from `[scheduler]`
    pub fn store(mut self, store: Arc<dyn TriggerStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub async fn build(self) -> JobResult<JobRuntime> {
        self.scheduler
            .validate()
            .map_err(|e| JobError::validation("scheduler", e.to_string()))?;

        let store = match self.store {
            Some(store) => store,
            None => build_trigger_store(&self.scheduler, &self.database).await?,
        };

        let codecs = Arc::new(self.codecs);
        let dispatch = Arc::new(self.dispatch);
        if dispatch.is_empty() {
            tracing::warn!("No dispatch mappings registered, every fired job will be dropped");
        }

        let dispatcher = JobDispatcher::new(dispatch);
        Ok(JobRuntime {
            scheduler: JobScheduler::new(Arc::clone(&store), codecs),
            remover: JobRemover::new(Arc::clone(&store)),
            service: JobService::new(Arc::clone(&store)),
            runner: Arc::new(JobRunner::new(Arc::clone(&store), dispatcher, &self.scheduler)),
            store,
        })
    }
}

/// Scheduler, remover, service and runner sharing one trigger store
pub struct JobRuntime {
    scheduler: JobScheduler,
    remover: JobRemover,
    service: JobService,
    runner: Arc<JobRunner>,
    store: Arc<dyn TriggerStore>,
}

impl JobRuntime {
    pub fn builder(scheduler: SchedulerConfig) -> JobRuntimeBuilder {
        JobRuntimeBuilder {
            scheduler,
            database: DatabaseConfig::default(),
            codecs: CodecRegistry::new(),
            dispatch: DispatchRegistry::new(),
            store: None,
        }
    }

    pub fn scheduler(&self) -> &JobScheduler {
        &self.scheduler
    }

    pub fn remover(&self) -> &JobRemover {
        &self.remover
    }

    pub fn service(&self) -> &JobService {
        &self.service
    }

    pub fn runner(&self) -> &Arc<JobRunner> {
        &self.runner
    }

    pub fn store(&self) -> &Arc<dyn TriggerStore> {
        &self.store
    }

    /// Start firing due jobs
    pub async fn start(&self) -> JobResult<()> {
        self.runner.start().await
    }

    /// Stop firing and wait for running executions
    pub async fn shutdown(&self) -> JobResult<()> {
        self.runner.shutdown().await
    }
}
