#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use axum_test::TestServer;
use chrono::{TimeDelta, Utc};
use cloudaudit_config::{Config, ConfigLoader, sources::EnvConfig};
use cloudaudit_core::{
    AuthError, CheckError, CheckErrorKind,
    auth::{CredentialKey, RefreshGrant, TokenRefresher},
    checks::{Check, CheckContext, CheckOutcome, CheckRegistry, FindingDraft},
    provider::{
        Bucket, CloudApi, Disk, FirewallRule, IamPolicy, Instance,
        ProviderResult, ServiceAccount, ServiceAccountKey,
    },
};
use cloudaudit_model::{
    CategoryId, Credential, ProjectRef, SessionId, TokenSecret,
};
use cloudaudit_server::{
    AppState, infra::bootstrap::assemble_state, routes::create_router,
};
use serde_json::{Value, json};
use url::Url;

pub const PROJECT: &str = "audit-test-project";

/// Refresher that always rejects; tests seed live credentials instead.
pub struct NoRefresh;

#[async_trait]
impl TokenRefresher for NoRefresh {
    async fn refresh(
        &self,
        _: &cloudaudit_model::TokenSecret,
    ) -> Result<RefreshGrant, AuthError> {
        Err(AuthError::NotConfigured("refresh disabled in tests"))
    }
}

/// Provider with no resources at all.
pub struct EmptyCloud;

#[async_trait]
impl CloudApi for EmptyCloud {
    async fn list_buckets(
        &self,
        _: &Credential,
        _: &ProjectRef,
    ) -> ProviderResult<Vec<Bucket>> {
        Ok(Vec::new())
    }

    async fn list_instances(
        &self,
        _: &Credential,
        _: &ProjectRef,
    ) -> ProviderResult<Vec<Instance>> {
        Ok(Vec::new())
    }

    async fn list_disks(
        &self,
        _: &Credential,
        _: &ProjectRef,
    ) -> ProviderResult<Vec<Disk>> {
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

    async fn iam_policy(
        &self,
        _: &Credential,
        _: &ProjectRef,
    ) -> ProviderResult<IamPolicy> {
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

    async fn list_firewalls(
        &self,
        _: &Credential,
        _: &ProjectRef,
    ) -> ProviderResult<Vec<FirewallRule>> {
        Ok(Vec::new())
    }

    async fn list_security_findings(
        &self,
        _: &Credential,
        _: &ProjectRef,
    ) -> ProviderResult<Vec<Value>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Scripted {
    Pass,
    Fail(&'static str),
    NotApplicable,
    Broken,
}

struct ScriptedCheck {
    name: &'static str,
    script: Scripted,
}

#[async_trait]
impl Check for ScriptedCheck {
    fn name(&self) -> &str {
        self.name
    }

    async fn run(
        &self,
        ctx: &CheckContext<'_>,
    ) -> Result<CheckOutcome, CheckError> {
        let resource = ctx.project.as_str();
        match self.script {
            Scripted::Pass => Ok(CheckOutcome::from_drafts(vec![
                FindingDraft::new(self.name, resource, true, "looks good"),
            ])),
            Scripted::Fail(recommend) => Ok(CheckOutcome::from_drafts(vec![
                FindingDraft::new(self.name, resource, false, "needs attention")
                    .recommend(recommend),
            ])),
            Scripted::NotApplicable => {
                Ok(CheckOutcome::not_applicable("0 buckets"))
            }
            Scripted::Broken => Err(CheckError::new(
                "",
                CheckErrorKind::Transport,
                "provider unreachable",
            )),
        }
    }
}

pub fn scripted(name: &'static str, script: Scripted) -> Arc<dyn Check> {
    Arc::new(ScriptedCheck { name, script })
}

/// Storage registered with the three-check pass/fail/not-applicable set.
pub fn storage_registry() -> CheckRegistry {
    let mut registry = CheckRegistry::new();
    registry.register(
        CategoryId::Storage,
        vec![
            scripted("Bucket Encryption", Scripted::Pass),
            scripted("Bucket Retention", Scripted::Fail("enable lifecycle")),
            scripted("Bucket Location", Scripted::NotApplicable),
        ],
    );
    registry
}

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
}

pub fn build_test_app(registry: CheckRegistry) -> Result<TestApp> {
    build_test_app_with(registry, Arc::new(NoRefresh), |_| {})
}

/// Same wiring as [`build_test_app`] with a chosen refresher and config
/// adjustments applied before the services are assembled.
pub fn build_test_app_with(
    registry: CheckRegistry,
    refresher: Arc<dyn TokenRefresher>,
    configure: impl FnOnce(&mut Config),
) -> Result<TestApp> {
    let mut config = ConfigLoader::new()
        .load_with(EnvConfig::default())
        .map_err(|err| anyhow!(err.to_string()))?
        .config;
    configure(&mut config);
    let state = assemble_state(
        Arc::new(config),
        registry,
        Arc::new(EmptyCloud),
        refresher,
    );

    let server = TestServer::builder()
        .build(create_router(state.clone()))
        .map_err(|err| anyhow!(err.to_string()))?;

    Ok(TestApp { server, state })
}

/// Serve `router` on an ephemeral loopback port for clients that speak
/// real HTTP.
pub async fn serve_on_loopback(router: axum::Router) -> Result<Url> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(Url::parse(&format!("http://{addr}/"))?)
}

/// Seed the anonymous session's credential for [`PROJECT`].
pub fn seed_credential(app: &TestApp, credential: Credential) -> Result<()> {
    let project =
        ProjectRef::new(PROJECT).ok_or_else(|| anyhow!("blank project"))?;
    app.state
        .credentials
        .put(CredentialKey::new(SessionId::anonymous(), project), credential);
    Ok(())
}

pub fn live_credential() -> Credential {
    Credential {
        access_token: TokenSecret::new("ya29.live"),
        refresh_token: None,
        expiry: Utc::now() + TimeDelta::hours(1),
        scopes: Vec::new(),
    }
}

pub fn credential_body() -> Value {
    json!({
        "accessToken": "ya29.live",
        "expiry": (Utc::now() + TimeDelta::hours(1)).to_rfc3339(),
        "scopes": ["https://www.googleapis.com/auth/cloud-platform"],
    })
}
