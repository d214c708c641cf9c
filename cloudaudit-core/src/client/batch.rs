use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::Arc,
    time::Duration,
};

use cloudaudit_model::{AggregatedResult, CategoryId, JobId, ProjectRef};
use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::{AuditApi, PollOutcome, StatusPoller};
use crate::error::ClientError;

pub const DEFAULT_PACING: Duration = Duration::from_secs(1);

/// Submissions attempted per category while the server answers 429.
pub const MAX_SUBMIT_ATTEMPTS: u32 = 5;

enum Submission {
    Accepted(JobId),
    Rejected(ClientError),
    Stopped,
}

/// Client-visible state of one category in a batch. `Cancelled` and
/// `TimedOut` say nothing about the server-side job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRunStatus {
    Idle,
    Running,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRun {
    pub category: CategoryId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    pub status: ClientRunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AggregatedResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CategoryRun {
    fn new(category: CategoryId, status: ClientRunStatus) -> Self {
        Self {
            category,
            job_id: None,
            status,
            result: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub runs: Vec<CategoryRun>,
    /// Set when `stop` cut the batch short.
    pub stopped: bool,
}

impl BatchReport {
    pub fn count(&self, status: ClientRunStatus) -> usize {
        self.runs.iter().filter(|run| run.status == status).count()
    }

    pub fn all_completed(&self) -> bool {
        !self.stopped
            && self
                .runs
                .iter()
                .all(|run| run.status == ClientRunStatus::Completed)
    }
}

/// Runs categories one after another, each fully observed through the
/// [`StatusPoller`] before the next starts, with a pacing delay between
/// submissions.
#[derive(Clone)]
pub struct BatchScheduler {
    project: ProjectRef,
    api: Arc<dyn AuditApi>,
    poller: StatusPoller,
    pacing: Duration,
    statuses: Arc<Mutex<BTreeMap<CategoryId, ClientRunStatus>>>,
    cancel: Arc<Mutex<CancellationToken>>,
}

impl fmt::Debug for BatchScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchScheduler")
            .field("project", &self.project)
            .field("poller", &self.poller)
            .field("pacing", &self.pacing)
            .finish_non_exhaustive()
    }
}

impl BatchScheduler {
    pub fn new(
        project: ProjectRef,
        api: Arc<dyn AuditApi>,
        poller: StatusPoller,
    ) -> Self {
        Self {
            project,
            api,
            poller,
            pacing: DEFAULT_PACING,
            statuses: Arc::new(Mutex::new(BTreeMap::new())),
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn statuses(&self) -> BTreeMap<CategoryId, ClientRunStatus> {
        self.statuses.lock().clone()
    }

    /// Run the given categories in order. Duplicates are run once each
    /// time they appear.
    #[instrument(skip(self, categories), fields(project = %self.project, count = categories.len()))]
    pub async fn run_all(&self, categories: &[CategoryId]) -> BatchReport {
        let cancel = CancellationToken::new();
        *self.cancel.lock() = cancel.clone();
        {
            let mut statuses = self.statuses.lock();
            statuses.clear();
            for category in categories {
                statuses.insert(*category, ClientRunStatus::Idle);
            }
        }

        let mut report = BatchReport::default();
        for (index, category) in categories.iter().copied().enumerate() {
            if index > 0 {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.pacing) => {}
                }
            }
            if cancel.is_cancelled() {
                report.stopped = true;
                break;
            }
            report.runs.push(self.run_one(category, &cancel).await);
        }

        if cancel.is_cancelled() {
            report.stopped = true;
        }
        info!(
            completed = report.count(ClientRunStatus::Completed),
            stopped = report.stopped,
            "batch finished"
        );
        report
    }

    /// Run a selection in stable (id) order.
    pub async fn run_selected(
        &self,
        selected: &BTreeSet<CategoryId>,
    ) -> BatchReport {
        let categories: Vec<CategoryId> = selected.iter().copied().collect();
        self.run_all(&categories).await
    }

    /// Stop watching. Categories still running are marked cancelled; their
    /// server-side jobs are not aborted.
    pub fn stop(&self) {
        self.cancel.lock().cancel();
        let mut statuses = self.statuses.lock();
        for status in statuses.values_mut() {
            if *status == ClientRunStatus::Running {
                *status = ClientRunStatus::Cancelled;
            }
        }
        info!("batch stopped; in-flight server jobs keep running");
    }

    fn set_status(&self, category: CategoryId, status: ClientRunStatus) {
        self.statuses.lock().insert(category, status);
    }

    /// Submit one category, sitting out server rate limits until the
    /// attempt budget runs out or the batch is stopped.
    async fn submit(
        &self,
        category: CategoryId,
        cancel: &CancellationToken,
    ) -> Submission {
        let mut attempt = 1;
        loop {
            match self.api.submit(&self.project, category).await {
                Ok(job_id) => return Submission::Accepted(job_id),
                Err(ClientError::RateLimited { retry_after, .. })
                    if attempt < MAX_SUBMIT_ATTEMPTS =>
                {
                    info!(
                        %category,
                        attempt,
                        retry_after_secs = retry_after.as_secs(),
                        "submission rate limited; waiting"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Submission::Stopped,
                        _ = tokio::time::sleep(retry_after) => {}
                    }
                    attempt += 1;
                }
                Err(err) => return Submission::Rejected(err),
            }
        }
    }

    async fn run_one(
        &self,
        category: CategoryId,
        cancel: &CancellationToken,
    ) -> CategoryRun {
        self.set_status(category, ClientRunStatus::Running);

        let job_id = match self.submit(category, cancel).await {
            Submission::Accepted(job_id) => job_id,
            Submission::Rejected(err) => {
                warn!(%category, error = %err, "submission failed");
                self.set_status(category, ClientRunStatus::Failed);
                let mut run = CategoryRun::new(category, ClientRunStatus::Failed);
                run.error = Some(err.to_string());
                return run;
            }
            Submission::Stopped => {
                self.set_status(category, ClientRunStatus::Cancelled);
                return CategoryRun::new(category, ClientRunStatus::Cancelled);
            }
        };

        let mut run = CategoryRun::new(category, ClientRunStatus::Running);
        run.job_id = Some(job_id);

        match self.poller.wait_for(job_id, cancel).await {
            PollOutcome::Completed(response) => {
                run.status = ClientRunStatus::Completed;
                run.result = response.aggregated();
            }
            PollOutcome::Failed { error } => {
                run.status = ClientRunStatus::Failed;
                run.error = Some(error);
            }
            PollOutcome::TimedOut { elapsed } => {
                run.status = ClientRunStatus::TimedOut;
                run.error = Some(format!(
                    "Audit timed out after {}s",
                    elapsed.as_secs()
                ));
            }
            PollOutcome::Stopped => {
                run.status = ClientRunStatus::Cancelled;
            }
        }

        self.set_status(category, run.status);
        run
    }
}
