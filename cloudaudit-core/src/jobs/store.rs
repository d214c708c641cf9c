use std::{fmt, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cloudaudit_model::{AggregatedResult, Job, JobId, JobStatus};
use dashmap::DashMap;
use tracing::debug;

use crate::error::{AuditError, Result};

/// The only ways a persisted job may change.
#[derive(Debug, Clone, PartialEq)]
pub enum JobTransition {
    Start,
    Complete(AggregatedResult),
    Fail(String),
}

impl JobTransition {
    pub fn target(&self) -> JobStatus {
        match self {
            JobTransition::Start => JobStatus::Running,
            JobTransition::Complete(_) => JobStatus::Completed,
            JobTransition::Fail(_) => JobStatus::Failed,
        }
    }
}

/// Job persistence port. Implementations must reject transitions that the
/// state machine does not allow, atomically with the write.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert(&self, job: Job) -> Result<()>;

    async fn get(&self, id: JobId) -> Result<Option<Job>>;

    async fn transition(
        &self,
        id: JobId,
        transition: JobTransition,
    ) -> Result<Job>;
}

/// Finished jobs kept by [`InMemoryJobStore`] unless configured otherwise.
pub const DEFAULT_RETAINED_JOBS: usize = 1000;

/// Process-local store. Once more than `max_retained` jobs are held, the
/// oldest finished ones are evicted on insert; pending and running jobs
/// are never evicted.
#[derive(Clone)]
pub struct InMemoryJobStore {
    jobs: Arc<DashMap<JobId, Job>>,
    max_retained: usize,
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self {
            jobs: Arc::default(),
            max_retained: DEFAULT_RETAINED_JOBS,
        }
    }
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(mut self, max_retained: usize) -> Self {
        self.max_retained = max_retained.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl fmt::Debug for InMemoryJobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryJobStore")
            .field("jobs", &self.jobs.len())
            .field("max_retained", &self.max_retained)
            .finish()
    }
}

impl InMemoryJobStore {
    fn evict_finished(&self) {
        let excess = self.jobs.len().saturating_sub(self.max_retained);
        if excess == 0 {
            return;
        }

        let mut finished: Vec<(DateTime<Utc>, JobId)> = self
            .jobs
            .iter()
            .filter(|job| job.status.is_terminal())
            .map(|job| (job.completed_at.unwrap_or(job.started_at), job.id))
            .collect();
        finished.sort_unstable();

        for (_, id) in finished.into_iter().take(excess) {
            self.jobs.remove(&id);
        }
        debug!(
            retained = self.jobs.len(),
            limit = self.max_retained,
            "evicted finished jobs"
        );
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: Job) -> Result<()> {
        if job.status != JobStatus::Pending {
            return Err(AuditError::Store(format!(
                "job {} must be inserted as pending, not {}",
                job.id, job.status
            )));
        }
        match self.jobs.entry(job.id) {
            dashmap::Entry::Occupied(_) => {
                return Err(AuditError::Store(format!(
                    "job {} already exists",
                    job.id
                )));
            }
            dashmap::Entry::Vacant(slot) => {
                slot.insert(job);
            }
        }
        self.evict_finished();
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>> {
        Ok(self.jobs.get(&id).map(|job| job.value().clone()))
    }

    async fn transition(
        &self,
        id: JobId,
        transition: JobTransition,
    ) -> Result<Job> {
        let mut job = self
            .jobs
            .get_mut(&id)
            .ok_or_else(|| AuditError::NotFound(format!("job {id}")))?;

        let target = transition.target();
        if !job.status.can_transition_to(target) {
            return Err(AuditError::IllegalTransition {
                job: id,
                from: job.status,
                to: target,
            });
        }

        job.status = target;
        match transition {
            JobTransition::Start => {}
            JobTransition::Complete(result) => {
                job.result = Some(result);
                job.completed_at = Some(Utc::now());
            }
            JobTransition::Fail(error) => {
                job.error = Some(error);
                job.completed_at = Some(Utc::now());
            }
        }

        Ok(job.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudaudit_model::{
        CategoryId, CategoryReport, CategorySelector, ProjectRef, Summary,
    };

    fn pending() -> Job {
        Job::pending(
            ProjectRef::new("proj").expect("project"),
            CategorySelector::One(CategoryId::Storage),
        )
    }

    fn result() -> AggregatedResult {
        AggregatedResult::Category(CategoryReport {
            category: CategoryId::Storage,
            findings: Vec::new(),
            errors: Vec::new(),
            summary: Summary::default(),
        })
    }

    #[tokio::test]
    async fn walks_the_happy_path() {
        let store = InMemoryJobStore::new();
        let job = pending();
        store.insert(job.clone()).await.expect("insert");

        let running = store
            .transition(job.id, JobTransition::Start)
            .await
            .expect("start");
        assert_eq!(running.status, JobStatus::Running);
        assert!(running.completed_at.is_none());

        let done = store
            .transition(job.id, JobTransition::Complete(result()))
            .await
            .expect("complete");
        assert_eq!(done.status, JobStatus::Completed);
        assert!(done.completed_at.is_some());
        assert!(done.result.is_some());
    }

    #[tokio::test]
    async fn terminal_jobs_are_immutable() {
        let store = InMemoryJobStore::new();
        let job = pending();
        store.insert(job.clone()).await.expect("insert");
        store
            .transition(job.id, JobTransition::Start)
            .await
            .expect("start");
        store
            .transition(job.id, JobTransition::Fail("boom".into()))
            .await
            .expect("fail");

        let err = store
            .transition(job.id, JobTransition::Complete(result()))
            .await
            .expect_err("terminal");
        assert!(matches!(
            err,
            AuditError::IllegalTransition {
                from: JobStatus::Failed,
                to: JobStatus::Completed,
                ..
            }
        ));

        let stored = store.get(job.id).await.expect("get").expect("job");
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.error.as_deref(), Some("boom"));
        assert!(stored.result.is_none());
    }

    #[tokio::test]
    async fn pending_cannot_skip_running() {
        let store = InMemoryJobStore::new();
        let job = pending();
        store.insert(job.clone()).await.expect("insert");

        assert!(matches!(
            store
                .transition(job.id, JobTransition::Complete(result()))
                .await,
            Err(AuditError::IllegalTransition { .. })
        ));
    }

    async fn finished(store: &InMemoryJobStore) -> JobId {
        let job = pending();
        store.insert(job.clone()).await.expect("insert");
        store
            .transition(job.id, JobTransition::Start)
            .await
            .expect("start");
        store
            .transition(job.id, JobTransition::Complete(result()))
            .await
            .expect("complete");
        job.id
    }

    #[tokio::test]
    async fn oldest_finished_jobs_are_evicted_past_the_cap() {
        let store = InMemoryJobStore::new().with_retention(2);
        let oldest = finished(&store).await;
        let newer = finished(&store).await;

        let running = pending();
        store.insert(running.clone()).await.expect("insert");
        store
            .transition(running.id, JobTransition::Start)
            .await
            .expect("start");

        assert_eq!(store.len(), 2);
        assert!(store.get(oldest).await.expect("get").is_none());
        assert!(store.get(newer).await.expect("get").is_some());
        assert!(store.get(running.id).await.expect("get").is_some());
    }

    #[tokio::test]
    async fn active_jobs_are_never_evicted() {
        let store = InMemoryJobStore::new().with_retention(1);
        let first = pending();
        let second = pending();
        store.insert(first.clone()).await.expect("insert");
        store.insert(second.clone()).await.expect("insert");

        assert_eq!(store.len(), 2);
        assert!(store.get(first.id).await.expect("get").is_some());
    }

    #[tokio::test]
    async fn duplicate_and_unknown_ids_are_rejected() {
        let store = InMemoryJobStore::new();
        let job = pending();
        store.insert(job.clone()).await.expect("insert");
        assert!(store.insert(job).await.is_err());

        assert!(matches!(
            store.transition(JobId::new(), JobTransition::Start).await,
            Err(AuditError::NotFound(_))
        ));
    }
}
