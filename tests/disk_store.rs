mod common;

use std::time::Duration;

use deferred_rs::config::{SchedulerConfig, StoreBackend};
use deferred_rs::{Job, JobRuntime};
use jiff::{SignedDuration, Timestamp};
use tempfile::TempDir;

use common::{Notice, RecordingExecutor, WINDOW, notice_codecs, notice_dispatch, test_config};

fn disk_config(dir: &TempDir) -> SchedulerConfig {
    let mut config = SchedulerConfig {
        backend: StoreBackend::Disk,
        ..test_config()
    };
    config.disk.directory = dir.path().to_string_lossy().into_owned();
    config.disk.name = "restart-test".to_string();
    config
}

async fn disk_runtime(config: SchedulerConfig, executor: &RecordingExecutor) -> JobRuntime {
    JobRuntime::builder(config)
        .codecs(notice_codecs())
        .dispatch(notice_dispatch(executor))
        .build()
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn job_due_while_down_fires_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let executor = RecordingExecutor::default();

    let job_id = {
        let runtime = disk_runtime(disk_config(&dir), &executor).await;
        let trigger_at = Timestamp::now() + SignedDuration::from_millis(500);
        runtime
            .scheduler()
            .schedule(Job::new("restart", "catch-up", Notice::new(7), trigger_at))
            .await
            .unwrap()
        // Runtime dropped without ever starting its runner
    };

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(executor.calls().is_empty());

    let runtime = disk_runtime(disk_config(&dir), &executor).await;
    assert_eq!(runtime.service().count_jobs(Some("restart")).await.unwrap(), 1);

    runtime.start().await.unwrap();
    assert_eq!(executor.wait_for(1, Duration::from_secs(5)).await, 1);
    runtime.shutdown().await.unwrap();

    let calls = executor.calls();
    assert_eq!(calls[0].job_id, job_id);
    assert_eq!(calls[0].payload, Notice::new(7));
    assert_eq!(runtime.service().count_jobs(None).await.unwrap(), 0);
}

#[tokio::test]
async fn pending_and_removed_jobs_survive_reopen_as_scheduled() {
    let dir = tempfile::tempdir().unwrap();
    let executor = RecordingExecutor::default();
    let later = Timestamp::now() + SignedDuration::from_hours(1);

    let (kept, removed) = {
        let runtime = disk_runtime(disk_config(&dir), &executor).await;
        let kept = runtime
            .scheduler()
            .schedule(Job::new("letters", "keep", Notice::new(8), later))
            .await
            .unwrap();
        let removed = runtime
            .scheduler()
            .schedule(Job::new("letters", "drop", Notice::new(9), later))
            .await
            .unwrap();
        assert!(runtime.remover().remove(&removed, "letters").await.unwrap());
        (kept, removed)
    };

    let runtime = disk_runtime(disk_config(&dir), &executor).await;
    let records = runtime.service().list_jobs(Some("letters")).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].job_id, kept);
    assert_ne!(records[0].job_id, removed);
    assert_eq!(records[0].trigger_at, later);
    assert!(!runtime.remover().remove(&removed, "letters").await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn only_jobs_left_scheduled_fire_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let executor = RecordingExecutor::default();
    let runtime = disk_runtime(disk_config(&dir), &executor).await;
    runtime.start().await.unwrap();

    let trigger_at = Timestamp::now() + SignedDuration::from_secs(2);
    let scheduler = runtime.scheduler();
    let fired = scheduler
        .schedule(Job::new("hearings", "notice", Notice::new(1), trigger_at))
        .await
        .unwrap();
    let cancelled_job = scheduler
        .schedule(Job::new("hearings", "notice", Notice::new(2), trigger_at))
        .await
        .unwrap();
    let cancelled_group = scheduler
        .schedule(Job::new("appeals", "notice", Notice::new(3), trigger_at))
        .await
        .unwrap();

    assert!(runtime.remover().remove(&cancelled_job, "hearings").await.unwrap());
    assert_eq!(runtime.remover().remove_group("appeals").await.unwrap(), 1);

    tokio::time::sleep(WINDOW).await;
    runtime.shutdown().await.unwrap();

    assert_eq!(executor.calls_for(&fired), 1);
    assert!(executor.calls()[0].executed_at >= trigger_at);
    assert_eq!(executor.calls_for(&cancelled_job), 0);
    assert_eq!(executor.calls_for(&cancelled_group), 0);
    assert_eq!(executor.calls()[0].payload, Notice::new(1));
    assert_eq!(runtime.service().count_jobs(None).await.unwrap(), 0);
}
