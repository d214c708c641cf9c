mod support;

use std::{sync::Arc, time::Duration};

use cloudaudit_core::{
    checks::CheckRegistry,
    client::{
        AuditApi, BatchScheduler, ClientRunStatus, DEFAULT_PACING, PollerSettings,
        StatusPoller,
    },
    jobs::DispatcherSettings,
};
use cloudaudit_model::{CategoryId, JobStatus};
use support::{Harness, InProcessApi, Scripted, project, scripted};
use tokio::time::Instant;

const CHECK_DURATION: Duration = Duration::from_secs(5);

fn slow_registry(categories: &[CategoryId], duration: Duration) -> CheckRegistry {
    let mut registry = CheckRegistry::new();
    for category in categories {
        registry.register(*category, vec![scripted("slow", Scripted::Sleep(duration))]);
    }
    registry
}

fn scheduler_for(api: Arc<InProcessApi>, poller: PollerSettings) -> BatchScheduler {
    let api: Arc<dyn AuditApi> = api;
    BatchScheduler::new(project(), api.clone(), StatusPoller::new(api, poller))
}

#[tokio::test(start_paused = true)]
async fn run_all_is_sequential_paced_and_dispatches_once_per_category() {
    let categories = [CategoryId::Storage, CategoryId::Compute, CategoryId::Iam];
    let harness = Harness::with_registry(
        slow_registry(&categories, CHECK_DURATION),
        DispatcherSettings::default(),
    );
    let api = Arc::new(InProcessApi::new(harness.dispatcher.clone()));
    let scheduler = scheduler_for(api.clone(), PollerSettings::default());

    let started = Instant::now();
    let report = scheduler.run_all(&categories).await;
    let elapsed = started.elapsed();

    assert!(report.all_completed());
    assert_eq!(api.submissions.lock().as_slice(), &categories);
    assert!(elapsed >= 3 * CHECK_DURATION + 2 * DEFAULT_PACING);
    for run in &report.runs {
        assert!(run.result.is_some(), "{:?} has no result", run.category);
    }
}

#[tokio::test(start_paused = true)]
async fn poller_gives_up_while_the_server_keeps_running() {
    let harness = Harness::with_registry(
        slow_registry(&[CategoryId::Compute], Duration::from_secs(10 * 60)),
        DispatcherSettings {
            hard_timeout: Duration::from_secs(30 * 60),
        },
    );
    let api = Arc::new(InProcessApi::new(harness.dispatcher.clone()));
    let poller = PollerSettings::default();
    let scheduler = scheduler_for(api, poller);

    let started = Instant::now();
    let report = scheduler.run_all(&[CategoryId::Compute]).await;
    let elapsed = started.elapsed();

    let run = &report.runs[0];
    assert_eq!(run.status, ClientRunStatus::TimedOut);
    assert!(elapsed >= poller.timeout);
    assert!(elapsed <= poller.timeout + poller.interval);

    tokio::time::sleep(Duration::from_secs(6 * 60)).await;
    let job_id = run.job_id.expect("job id");
    let job = harness
        .dispatcher
        .get(job_id)
        .await
        .expect("get")
        .expect("job");
    assert_eq!(job.status, JobStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_the_client_view_only() {
    let categories = [CategoryId::Storage, CategoryId::Compute];
    let harness = Harness::with_registry(
        slow_registry(&categories, Duration::from_secs(30)),
        DispatcherSettings::default(),
    );
    let api = Arc::new(InProcessApi::new(harness.dispatcher.clone()));
    let scheduler = scheduler_for(api.clone(), PollerSettings::default());

    let batch = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.run_all(&categories).await })
    };

    tokio::time::sleep(Duration::from_secs(3)).await;
    scheduler.stop();
    let report = batch.await.expect("join");

    assert!(report.stopped);
    assert_eq!(report.runs.len(), 1);
    assert_eq!(report.runs[0].status, ClientRunStatus::Cancelled);
    assert_eq!(api.submissions.lock().as_slice(), &[CategoryId::Storage]);

    let statuses = scheduler.statuses();
    assert_eq!(statuses[&CategoryId::Storage], ClientRunStatus::Cancelled);
    assert_eq!(statuses[&CategoryId::Compute], ClientRunStatus::Idle);

    tokio::time::sleep(Duration::from_secs(60)).await;
    let job_id = report.runs[0].job_id.expect("job id");
    let job = harness
        .dispatcher
        .get(job_id)
        .await
        .expect("get")
        .expect("job");
    assert_eq!(job.status, JobStatus::Completed);
}
