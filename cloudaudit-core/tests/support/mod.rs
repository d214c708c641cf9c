#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use cloudaudit_core::{
    AuthError, CheckError, CheckErrorKind, ClientError,
    aggregate::Aggregator,
    auth::{CredentialKey, CredentialStore, RefreshGrant, TokenManager, TokenRefresher},
    checks::{Check, CheckContext, CheckOutcome, CheckRegistry, CheckRunner, FindingDraft},
    client::AuditApi,
    jobs::{DispatcherSettings, InMemoryJobStore, JobDispatcher, RunRequest},
    provider::{
        Bucket, CloudApi, Disk, FirewallRule, IamPolicy, Instance, ProviderResult,
        ServiceAccount, ServiceAccountKey,
    },
};
use cloudaudit_model::{
    CategoryId, CategorySelector, Credential, JobId, JobStatusResponse, ProjectRef,
    SessionId, TokenSecret,
};
use parking_lot::Mutex;
use serde_json::Value;

pub const PROJECT: &str = "audit-test-project";

pub fn project() -> ProjectRef {
    ProjectRef::new(PROJECT).expect("project")
}

pub fn live_credential() -> Credential {
    Credential {
        access_token: TokenSecret::new("ya29.live"),
        refresh_token: None,
        expiry: Utc::now() + TimeDelta::hours(1),
        scopes: vec!["cloud-platform".into()],
    }
}

/// Refresher that must never be reached.
pub struct NoRefresh;

#[async_trait]
impl TokenRefresher for NoRefresh {
    async fn refresh(&self, _: &TokenSecret) -> Result<RefreshGrant, AuthError> {
        Err(AuthError::NotConfigured("refresh disabled in tests"))
    }
}

/// Provider that reports a fixed bucket list and nothing else.
#[derive(Default)]
pub struct FakeCloud {
    pub buckets: Vec<Bucket>,
}

#[async_trait]
impl CloudApi for FakeCloud {
    async fn list_buckets(&self, _: &Credential, _: &ProjectRef) -> ProviderResult<Vec<Bucket>> {
        Ok(self.buckets.clone())
    }

    async fn list_instances(&self, _: &Credential, _: &ProjectRef) -> ProviderResult<Vec<Instance>> {
        Ok(Vec::new())
    }

    async fn list_disks(&self, _: &Credential, _: &ProjectRef) -> ProviderResult<Vec<Disk>> {
        Ok(Vec::new())
    }

    async fn metric_points(
        &self,
        _: &Credential,
        _: &ProjectRef,
        _: &str,
        _: i64,
    ) -> ProviderResult<Vec<f64>> {
        Ok(Vec::new())
    }

    async fn iam_policy(&self, _: &Credential, _: &ProjectRef) -> ProviderResult<IamPolicy> {
        Ok(IamPolicy::default())
    }

    async fn list_service_accounts(
        &self,
        _: &Credential,
        _: &ProjectRef,
    ) -> ProviderResult<Vec<ServiceAccount>> {
        Ok(Vec::new())
    }

    async fn list_user_managed_keys(
        &self,
        _: &Credential,
        _: &ProjectRef,
        _: &str,
    ) -> ProviderResult<Vec<ServiceAccountKey>> {
        Ok(Vec::new())
    }

    async fn list_firewalls(&self, _: &Credential, _: &ProjectRef) -> ProviderResult<Vec<FirewallRule>> {
        Ok(Vec::new())
    }

    async fn list_security_findings(&self, _: &Credential, _: &ProjectRef) -> ProviderResult<Vec<Value>> {
        Ok(Vec::new())
    }
}

/// Check with a predetermined behaviour.
#[derive(Debug, Clone)]
pub enum Scripted {
    Pass,
    Fail { recommend: &'static str },
    NotApplicable,
    Error,
    Unauthorized,
    Sleep(Duration),
}

#[derive(Debug, Clone)]
pub struct ScriptedCheck {
    pub name: &'static str,
    pub script: Scripted,
}

pub fn scripted(name: &'static str, script: Scripted) -> Arc<dyn Check> {
    Arc::new(ScriptedCheck { name, script })
}

#[async_trait]
impl Check for ScriptedCheck {
    fn name(&self) -> &str {
        self.name
    }

    async fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
        let resource = ctx.project.as_str();
        match &self.script {
            Scripted::Pass => Ok(CheckOutcome::from_drafts(vec![FindingDraft::new(
                self.name, resource, true, "looks good",
            )])),
            Scripted::Fail { recommend } => Ok(CheckOutcome::from_drafts(vec![
                FindingDraft::new(self.name, resource, false, "needs attention")
                    .recommend(*recommend),
            ])),
            Scripted::NotApplicable => Ok(CheckOutcome::not_applicable("0 buckets")),
            Scripted::Error => Err(CheckError::new(
                "",
                CheckErrorKind::PermissionDenied,
                "caller lacks storage.buckets.list",
            )),
            Scripted::Unauthorized => Err(CheckError::new(
                "",
                CheckErrorKind::Unauthorized,
                "token revoked",
            )),
            Scripted::Sleep(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(CheckOutcome::from_drafts(vec![FindingDraft::new(
                    self.name, resource, true, "slow but fine",
                )]))
            }
        }
    }
}

pub struct Harness {
    pub dispatcher: JobDispatcher,
    pub store: CredentialStore,
}

impl Harness {
    pub fn with_registry(registry: CheckRegistry, settings: DispatcherSettings) -> Self {
        Self::with_parts(registry, FakeCloud::default(), settings)
    }

    pub fn with_parts(
        registry: CheckRegistry,
        cloud: FakeCloud,
        settings: DispatcherSettings,
    ) -> Self {
        let store = CredentialStore::new();
        store.put(
            CredentialKey::new(SessionId::anonymous(), project()),
            live_credential(),
        );
        let tokens = TokenManager::new(store.clone(), Arc::new(NoRefresh));
        let runner = CheckRunner::new(Arc::new(registry), Arc::new(cloud));
        let dispatcher = JobDispatcher::new(
            Arc::new(InMemoryJobStore::new()),
            tokens,
            runner,
            Aggregator::default(),
            settings,
        );
        Self { dispatcher, store }
    }

    pub fn request(&self, selector: CategorySelector) -> RunRequest {
        RunRequest::new(SessionId::anonymous(), project(), selector)
    }
}

/// [`AuditApi`] served by an in-process dispatcher, counting submissions.
pub struct InProcessApi {
    pub dispatcher: JobDispatcher,
    pub submissions: Mutex<Vec<CategoryId>>,
}

impl InProcessApi {
    pub fn new(dispatcher: JobDispatcher) -> Self {
        Self {
            dispatcher,
            submissions: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AuditApi for InProcessApi {
    async fn submit(&self, project: &ProjectRef, category: CategoryId) -> Result<JobId, ClientError> {
        self.submissions.lock().push(category);
        let request = RunRequest::new(
            SessionId::anonymous(),
            project.clone(),
            CategorySelector::One(category),
        );
        self.dispatcher
            .submit(request)
            .await
            .map(|job| job.id)
            .map_err(|err| ClientError::Http {
                status: 500,
                message: err.to_string(),
            })
    }

    async fn status(&self, job: JobId) -> Result<JobStatusResponse, ClientError> {
        match self.dispatcher.get(job).await {
            Ok(Some(job)) => Ok(JobStatusResponse::from_job(&job)),
            Ok(None) => Err(ClientError::Http {
                status: 404,
                message: "Job not found".into(),
            }),
            Err(err) => Err(ClientError::Transport(err.to_string())),
        }
    }
}
