use std::{fmt, sync::Arc, time::Duration};

use cloudaudit_model::{
    AggregatedResult, CategoryId, CategoryReport, CategorySelector,
    Credential, Job, JobId, ProjectRef, SessionId,
};
use tracing::{Instrument, error, info, info_span, instrument, warn};

use super::{JobStore, JobTransition};
use crate::aggregate::Aggregator;
use crate::auth::{CredentialKey, TokenManager};
use crate::checks::CheckRunner;
use crate::error::{AuditError, AuthError, Result, ValidationError};

pub const DEFAULT_HARD_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    /// Wall-clock budget for one job's check execution.
    pub hard_timeout: Duration,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            hard_timeout: DEFAULT_HARD_TIMEOUT,
        }
    }
}

/// A validated audit run request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub session: SessionId,
    pub project: ProjectRef,
    pub selector: CategorySelector,
}

impl RunRequest {
    pub fn new(
        session: SessionId,
        project: ProjectRef,
        selector: CategorySelector,
    ) -> Self {
        Self {
            session,
            project,
            selector,
        }
    }

    /// Validate raw request fields. A missing or blank category means `all`.
    pub fn parse(
        session: SessionId,
        project_id: Option<&str>,
        category: Option<&str>,
    ) -> std::result::Result<Self, ValidationError> {
        let project = project_id
            .and_then(ProjectRef::new)
            .ok_or(ValidationError::MissingProject)?;

        let selector = match category.map(str::trim).filter(|c| !c.is_empty())
        {
            None => CategorySelector::All,
            Some(raw) => raw.parse::<CategorySelector>()?,
        };

        Ok(Self::new(session, project, selector))
    }

    fn credential_key(&self) -> CredentialKey {
        CredentialKey::new(self.session.clone(), self.project.clone())
    }
}

/// Terminal job plus the typed cause when it failed.
#[derive(Debug)]
pub struct RunOutcome {
    pub job: Job,
    pub failure: Option<AuditError>,
}

/// Owns the job state machine: creates jobs, runs them through the check
/// runner and aggregator, and records exactly one terminal transition.
#[derive(Clone)]
pub struct JobDispatcher {
    jobs: Arc<dyn JobStore>,
    tokens: TokenManager,
    runner: CheckRunner,
    aggregator: Arc<Aggregator>,
    settings: DispatcherSettings,
}

impl fmt::Debug for JobDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobDispatcher")
            .field("runner", &self.runner)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl JobDispatcher {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        tokens: TokenManager,
        runner: CheckRunner,
        aggregator: Aggregator,
        settings: DispatcherSettings,
    ) -> Self {
        Self {
            jobs,
            tokens,
            runner,
            aggregator: Arc::new(aggregator),
            settings,
        }
    }

    pub fn jobs(&self) -> &Arc<dyn JobStore> {
        &self.jobs
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn runner(&self) -> &CheckRunner {
        &self.runner
    }

    pub fn settings(&self) -> &DispatcherSettings {
        &self.settings
    }

    pub async fn get(&self, id: JobId) -> Result<Option<Job>> {
        self.jobs.get(id).await
    }

    /// Run a job to completion and return it in its terminal state.
    #[instrument(skip(self, request), fields(project = %request.project, category = %request.selector))]
    pub async fn run(&self, request: RunRequest) -> Result<RunOutcome> {
        let job = self.open(&request).await?;
        self.drive(job.id, request).await
    }

    /// Start a job and finish it on a spawned task. Returns the job as it
    /// is when execution begins (`running`).
    #[instrument(skip(self, request), fields(project = %request.project, category = %request.selector))]
    pub async fn submit(&self, request: RunRequest) -> Result<Job> {
        let job = self.open(&request).await?;
        let id = job.id;
        let dispatcher = self.clone();

        tokio::spawn(
            async move {
                if let Err(err) = dispatcher.drive(id, request).await {
                    error!(error = %err, "failed to record job outcome");
                }
            }
            .instrument(info_span!("background_job", job_id = %id)),
        );

        Ok(job)
    }

    async fn open(&self, request: &RunRequest) -> Result<Job> {
        let job = Job::pending(request.project.clone(), request.selector);
        let id = job.id;
        self.jobs.insert(job).await?;
        let running = self.jobs.transition(id, JobTransition::Start).await?;
        info!(job_id = %id, "job started");
        Ok(running)
    }

    async fn drive(&self, id: JobId, request: RunRequest) -> Result<RunOutcome> {
        let execution =
            tokio::time::timeout(self.settings.hard_timeout, self.execute(&request))
                .await;

        let (transition, failure) = match execution {
            Ok(Ok(result)) => (JobTransition::Complete(result), None),
            Ok(Err(err)) => {
                warn!(job_id = %id, error = %err, "job failed");
                (JobTransition::Fail(err.to_string()), Some(err.into()))
            }
            Err(_) => {
                let message = format!(
                    "Audit exceeded the hard timeout of {}s",
                    self.settings.hard_timeout.as_secs()
                );
                warn!(job_id = %id, "job timed out");
                (
                    JobTransition::Fail(message.clone()),
                    Some(AuditError::Timeout(message)),
                )
            }
        };

        let job = self.jobs.transition(id, transition).await?;
        info!(job_id = %id, status = %job.status, "job finished");
        Ok(RunOutcome { job, failure })
    }

    async fn execute(
        &self,
        request: &RunRequest,
    ) -> std::result::Result<AggregatedResult, AuthError> {
        let credential =
            self.tokens.get_credential(&request.credential_key()).await?;

        match request.selector {
            CategorySelector::One(category) => {
                let report = self
                    .run_one(category, &credential, &request.project)
                    .await?;
                Ok(AggregatedResult::Category(report))
            }
            CategorySelector::All => {
                let mut outcomes = Vec::with_capacity(CategoryId::ALL.len());
                for category in CategoryId::ALL {
                    let outcome = self
                        .run_one(category, &credential, &request.project)
                        .await
                        .map_err(|err| err.to_string());
                    outcomes.push((category, outcome));
                }
                Ok(AggregatedResult::All(self.aggregator.combine(outcomes)))
            }
        }
    }

    async fn run_one(
        &self,
        category: CategoryId,
        credential: &Credential,
        project: &ProjectRef,
    ) -> std::result::Result<CategoryReport, AuthError> {
        let raw = self
            .runner
            .run_category(category, credential, project)
            .await?;
        Ok(self.aggregator.normalize(&raw))
    }
}
