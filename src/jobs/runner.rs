//! Firing clock
//!
//! A repeated tokio-cron-scheduler job polls the trigger store. Each poll
//! claims at most as many due records as there are free execution permits, so
//! a claimed record always has a slot to run in.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use jiff::Timestamp;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio_cron_scheduler::{Job as CronJob, JobScheduler as CronScheduler};
use tokio_util::task::TaskTracker;

use crate::config::SchedulerConfig;
use crate::jobs::dispatcher::JobDispatcher;
use crate::jobs::error::{JobError, JobResult};
use crate::jobs::executor::InFlightTracker;
use crate::jobs::models::PersistedJobRecord;
use crate::trigger::TriggerStore;

struct RunnerCore {
    store: Arc<dyn TriggerStore>,
    dispatcher: JobDispatcher,
    permits: Arc<Semaphore>,
    tasks: TaskTracker,
    in_flight: InFlightTracker,
    poll_guard: Mutex<()>,
    batch_size: usize,
}

impl RunnerCore {
    async fn poll_once(&self) -> JobResult<usize> {
        let Ok(_guard) = self.poll_guard.try_lock() else {
            tracing::debug!("Previous poll still running, skipping tick");
            return Ok(0);
        };

        let permits = self.reserve_permits();
        if permits.is_empty() {
            return Ok(0);
        }

        let records = self
            .store
            .claim_due(Timestamp::now(), permits.len())
            .await?;
        let claimed = records.len();
        if claimed > 0 {
            tracing::debug!(
                claimed,
                backend = self.store.backend_name(),
                "Claimed due jobs"
            );
        }

        for (record, permit) in records.into_iter().zip(permits) {
            self.spawn_dispatch(record, permit).await;
        }
        Ok(claimed)
    }

    fn reserve_permits(&self) -> Vec<OwnedSemaphorePermit> {
        let mut permits = Vec::new();
        while permits.len() < self.batch_size {
            match Arc::clone(&self.permits).try_acquire_owned() {
                Ok(permit) => permits.push(permit),
                Err(_) => break,
            }
        }
        permits
    }

    async fn spawn_dispatch(&self, record: PersistedJobRecord, permit: OwnedSemaphorePermit) {
        let dispatcher = self.dispatcher.clone();
        let in_flight = self.in_flight.clone();
        let job_group = record.job_group.clone();

        in_flight.increment(&job_group).await;
        self.tasks.spawn(async move {
            dispatcher.dispatch(record).await;
            in_flight.decrement(&job_group).await;
            drop(permit);
        });
    }
}

/// Periodically claims due jobs and dispatches each on its own task
pub struct JobRunner {
    core: Arc<RunnerCore>,
    poll_interval: Duration,
    shutdown_timeout: Duration,
    cron: Mutex<Option<CronScheduler>>,
}

impl JobRunner {
    pub fn new(
        store: Arc<dyn TriggerStore>,
        dispatcher: JobDispatcher,
        config: &SchedulerConfig,
    ) -> Self {
        let core = RunnerCore {
            store,
            dispatcher,
            permits: Arc::new(Semaphore::new(config.max_concurrent_executions)),
            tasks: TaskTracker::new(),
            in_flight: InFlightTracker::new(),
            poll_guard: Mutex::new(()),
            batch_size: config.batch_size,
        };

        Self {
            core: Arc::new(core),
            poll_interval: config.poll_interval(),
            shutdown_timeout: config.shutdown_timeout(),
            cron: Mutex::new(None),
        }
    }

    /// Run one poll now, returning how many jobs were claimed
    ///
    /// Claimed jobs are dispatched in the background. A poll overlapping one
    /// that is still running claims nothing.
    pub async fn poll_once(&self) -> JobResult<usize> {
        self.core.poll_once().await
    }

    /// Start ticking every `poll_interval` (whole seconds). Calling it twice is
    /// a no-op.
    pub async fn start(&self) -> JobResult<()> {
        let mut cron = self.cron.lock().await;
        if cron.is_some() {
            return Ok(());
        }

        let scheduler = CronScheduler::new().await.map_err(runner_error)?;
        let core = Arc::clone(&self.core);
        let tick = CronJob::new_repeated_async(self.poll_interval, move |_uuid, _lock| {
            let core = Arc::clone(&core);
            Box::pin(async move {
                if let Err(e) = core.poll_once().await {
                    tracing::error!(error = %e, "Failed to poll trigger store");
                }
            })
        })
        .map_err(runner_error)?;

        scheduler.add(tick).await.map_err(runner_error)?;
        scheduler.start().await.map_err(runner_error)?;
        *cron = Some(scheduler);

        tracing::info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            batch_size = self.core.batch_size,
            backend = self.core.store.backend_name(),
            "Job runner started"
        );

        // Catch up on anything that fell due while the process was down
        if let Err(e) = self.core.poll_once().await {
            tracing::error!(error = %e, "Failed initial poll of trigger store");
        }
        Ok(())
    }

    /// Stop polling and wait up to the shutdown timeout for running jobs
    ///
    /// Jobs still running after the timeout are left to finish on their own.
    pub async fn shutdown(&self) -> JobResult<()> {
        if let Some(mut scheduler) = self.cron.lock().await.take() {
            scheduler.shutdown().await.map_err(runner_error)?;
        }

        self.core.permits.close();
        // Let an in-progress poll finish handing out its claimed jobs
        let _guard = self.core.poll_guard.lock().await;
        self.core.tasks.close();

        match tokio::time::timeout(self.shutdown_timeout, self.core.tasks.wait()).await {
            Ok(()) => tracing::info!("Job runner stopped"),
            Err(_) => tracing::warn!(
                still_running = self.core.tasks.len(),
                timeout_seconds = self.shutdown_timeout.as_secs(),
                "Job runner stopped with executions still running"
            ),
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.cron
            .try_lock()
            .map(|cron| cron.is_some())
            .unwrap_or(true)
    }

    /// Number of dispatch tasks not yet finished
    pub fn active_executions(&self) -> usize {
        self.core.tasks.len()
    }

    /// Running executions per job group
    pub async fn in_flight(&self) -> HashMap<String, usize> {
        self.core.in_flight.snapshot().await
    }
}

fn runner_error(e: tokio_cron_scheduler::JobSchedulerError) -> JobError {
    JobError::Runner {
        source: anyhow::Error::from(e),
    }
}
