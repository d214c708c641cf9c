mod support;

use std::time::Duration;

use cloudaudit_core::{
    AuditError, AuthError,
    checks::{
        CheckRegistry,
        builtin::{BucketEncryption, BucketLocation, BucketRetention},
    },
    jobs::{DispatcherSettings, JobTransition, RunRequest},
    provider::{self, Bucket},
};
use cloudaudit_model::{
    AggregatedResult, CategoryId, CategoryOutcome, CategoryReport,
    CategorySelector, JobStatus, ProjectRef, SessionId,
};
use std::sync::Arc;
use support::{FakeCloud, Harness, Scripted, scripted};

fn category_report(result: Option<AggregatedResult>) -> CategoryReport {
    match result {
        Some(AggregatedResult::Category(report)) => report,
        other => panic!("expected a single-category result, got {other:?}"),
    }
}

#[tokio::test]
async fn storage_scenario_counts_not_applicable_without_a_finding() {
    let mut registry = CheckRegistry::new();
    registry.register(
        CategoryId::Storage,
        vec![
            scripted("BucketEncryption", Scripted::Pass),
            scripted(
                "BucketRetention",
                Scripted::Fail {
                    recommend: "enable lifecycle",
                },
            ),
            scripted("BucketLocation", Scripted::NotApplicable),
        ],
    );
    let harness = Harness::with_registry(registry, DispatcherSettings::default());

    let outcome = harness
        .dispatcher
        .run(harness.request(CategorySelector::One(CategoryId::Storage)))
        .await
        .expect("run");

    assert!(outcome.failure.is_none());
    assert_eq!(outcome.job.status, JobStatus::Completed);
    assert!(outcome.job.completed_at.is_some());

    let report = category_report(outcome.job.result);
    assert_eq!(report.summary.total_checks, 3);
    assert_eq!(report.summary.passed, 1);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.not_applicable, 1);
    assert!(report.summary.is_consistent());
    assert_eq!(report.findings.len(), 2);
    assert_eq!(
        report.findings[1].recommendation.as_deref(),
        Some("enable lifecycle")
    );
}

#[tokio::test]
async fn a_failing_check_is_isolated_and_the_job_completes() {
    let mut registry = CheckRegistry::new();
    registry.register(
        CategoryId::Iam,
        vec![
            scripted("first", Scripted::Pass),
            scripted("second", Scripted::Error),
            scripted("third", Scripted::Pass),
        ],
    );
    let harness = Harness::with_registry(registry, DispatcherSettings::default());

    let outcome = harness
        .dispatcher
        .run(harness.request(CategorySelector::One(CategoryId::Iam)))
        .await
        .expect("run");

    assert_eq!(outcome.job.status, JobStatus::Completed);
    let report = category_report(outcome.job.result);
    assert_eq!(report.findings.len(), 2);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].check, "second");
    assert_eq!(report.summary.passed, 2);
    assert_eq!(report.summary.failed, 1);
    assert!(report.summary.is_consistent());
}

#[tokio::test]
async fn builtin_storage_checks_estimate_savings() {
    let mut registry = CheckRegistry::new();
    registry.register(
        CategoryId::Storage,
        vec![
            Arc::new(BucketEncryption),
            Arc::new(BucketRetention),
            Arc::new(BucketLocation),
        ],
    );
    let cloud = FakeCloud {
        buckets: vec![Bucket {
            name: "logs".into(),
            location: "US-EAST1".into(),
            location_type: Some("region".into()),
            encryption: Some(provider::BucketEncryption {
                default_kms_key_name: Some("projects/p/keys/k".into()),
            }),
            ..Bucket::default()
        }],
    };
    let harness =
        Harness::with_parts(registry, cloud, DispatcherSettings::default());

    let outcome = harness
        .dispatcher
        .run(harness.request(CategorySelector::One(CategoryId::Storage)))
        .await
        .expect("run");

    let report = category_report(outcome.job.result);
    assert_eq!(report.summary.total_checks, 3);
    assert_eq!(report.summary.passed, 2);
    assert_eq!(report.summary.failed, 1);

    let retention = report
        .findings
        .iter()
        .find(|f| !f.passed)
        .expect("failed finding");
    assert_eq!(retention.check_name, "Bucket Retention");
    assert_eq!(retention.resource, "logs");
    assert!(retention.has_savings_estimate());
    assert_eq!(report.summary.estimated_savings, 75);
}

#[tokio::test]
async fn revoked_credential_fails_a_single_category_job() {
    let mut registry = CheckRegistry::new();
    registry.register(
        CategoryId::Storage,
        vec![
            scripted("first", Scripted::Pass),
            scripted("second", Scripted::Unauthorized),
        ],
    );
    let harness = Harness::with_registry(registry, DispatcherSettings::default());

    let outcome = harness
        .dispatcher
        .run(harness.request(CategorySelector::One(CategoryId::Storage)))
        .await
        .expect("run");

    assert_eq!(outcome.job.status, JobStatus::Failed);
    assert!(outcome.job.result.is_none());
    assert!(
        outcome
            .job
            .error
            .as_deref()
            .is_some_and(|e| e.contains("token revoked"))
    );
    assert!(matches!(
        outcome.failure,
        Some(AuditError::Auth(AuthError::Revoked { .. }))
    ));
}

#[tokio::test]
async fn missing_credential_fails_the_job() {
    let harness =
        Harness::with_registry(CheckRegistry::new(), DispatcherSettings::default());
    let request = RunRequest::new(
        SessionId::anonymous(),
        ProjectRef::new("someone-else").expect("project"),
        CategorySelector::One(CategoryId::Storage),
    );

    let outcome = harness.dispatcher.run(request).await.expect("run");

    assert_eq!(outcome.job.status, JobStatus::Failed);
    assert!(matches!(
        outcome.failure,
        Some(AuditError::Auth(AuthError::MissingCredential { .. }))
    ));
}

#[tokio::test]
async fn all_categories_keep_going_past_an_auth_failure() {
    let mut registry = CheckRegistry::new();
    registry
        .register(CategoryId::Storage, vec![scripted("ok", Scripted::Pass)])
        .register(
            CategoryId::Iam,
            vec![scripted("revoked", Scripted::Unauthorized)],
        );
    let harness = Harness::with_registry(registry, DispatcherSettings::default());

    let outcome = harness
        .dispatcher
        .run(harness.request(CategorySelector::All))
        .await
        .expect("run");

    assert_eq!(outcome.job.status, JobStatus::Completed);
    let Some(AggregatedResult::All(all)) = outcome.job.result else {
        panic!("expected an all-categories result");
    };

    assert_eq!(all.categories.len(), CategoryId::ALL.len());
    assert!(matches!(
        all.categories.get(&CategoryId::Iam),
        Some(CategoryOutcome::Errored { .. })
    ));
    assert!(matches!(
        all.categories.get(&CategoryId::Storage),
        Some(CategoryOutcome::Completed(_))
    ));

    let Some(CategoryOutcome::Completed(placeholder)) =
        all.categories.get(&CategoryId::Bigquery)
    else {
        panic!("unregistered category should complete with a placeholder");
    };
    assert_eq!(placeholder.findings.len(), 1);
    assert_eq!(placeholder.summary.total_checks, 1);
    assert_eq!(placeholder.summary.not_applicable, 1);

    assert_eq!(all.summary.categories_errored, 1);
    assert_eq!(all.summary.categories_run, CategoryId::ALL.len() as u32 - 1);
    assert_eq!(all.summary.totals.passed, 1);
    assert!(all.summary.totals.is_consistent());
}

#[tokio::test(start_paused = true)]
async fn hard_timeout_fails_the_job() {
    let mut registry = CheckRegistry::new();
    registry.register(
        CategoryId::Compute,
        vec![scripted("stuck", Scripted::Sleep(Duration::from_secs(600)))],
    );
    let harness = Harness::with_registry(registry, DispatcherSettings::default());

    let started = tokio::time::Instant::now();
    let outcome = harness
        .dispatcher
        .run(harness.request(CategorySelector::One(CategoryId::Compute)))
        .await
        .expect("run");

    assert_eq!(outcome.job.status, JobStatus::Failed);
    assert!(matches!(outcome.failure, Some(AuditError::Timeout(_))));
    assert!(
        outcome
            .job
            .error
            .as_deref()
            .is_some_and(|e| e.contains("hard timeout"))
    );
    assert!(started.elapsed() < Duration::from_secs(600));
}

#[tokio::test]
async fn finished_jobs_reject_further_transitions() {
    let mut registry = CheckRegistry::new();
    registry.register(CategoryId::Storage, vec![scripted("ok", Scripted::Pass)]);
    let harness = Harness::with_registry(registry, DispatcherSettings::default());

    let outcome = harness
        .dispatcher
        .run(harness.request(CategorySelector::One(CategoryId::Storage)))
        .await
        .expect("run");
    let id = outcome.job.id;

    let err = harness
        .dispatcher
        .jobs()
        .transition(id, JobTransition::Fail("late".into()))
        .await
        .expect_err("terminal");
    assert!(matches!(err, AuditError::IllegalTransition { .. }));

    let stored = harness
        .dispatcher
        .get(id)
        .await
        .expect("get")
        .expect("job");
    assert_eq!(stored.status, JobStatus::Completed);
    assert!(stored.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn background_submission_returns_running_then_completes() {
    let mut registry = CheckRegistry::new();
    registry.register(
        CategoryId::Storage,
        vec![scripted("slow", Scripted::Sleep(Duration::from_secs(3)))],
    );
    let harness = Harness::with_registry(registry, DispatcherSettings::default());

    let job = harness
        .dispatcher
        .submit(harness.request(CategorySelector::One(CategoryId::Storage)))
        .await
        .expect("submit");
    assert_eq!(job.status, JobStatus::Running);

    tokio::time::sleep(Duration::from_secs(5)).await;

    let stored = harness
        .dispatcher
        .get(job.id)
        .await
        .expect("get")
        .expect("job");
    assert_eq!(stored.status, JobStatus::Completed);
    assert!(stored.result.is_some());
}
