//! Wires configuration into the long-lived services behind [`AppState`].

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use cloudaudit_config::{Config, FallbackConfig, ProviderConfig};
use cloudaudit_core::{
    aggregate::{Aggregator, SavingsTable},
    auth::{
        CredentialStore, FallbackPolicy, OAuthClientSettings,
        OAuthTokenClient, TokenManager, TokenRefresher,
    },
    checks::{CheckRegistry, CheckRunner},
    inventory::{InMemoryInventoryStore, InventoryService},
    jobs::{DispatcherSettings, InMemoryJobStore, JobDispatcher},
    provider::{CloudApi, ProviderClient, ProviderEndpoints},
};
use cloudaudit_model::{Credential, TokenSecret};
use tracing::{info, warn};

use super::{app_state::AppState, rate_limit::RunRateLimiter};

/// Production wiring: reqwest-backed provider and token clients with the
/// built-in check-sets.
pub fn build_state(
    config: Arc<Config>,
    http: reqwest::Client,
) -> anyhow::Result<AppState> {
    let endpoints = provider_endpoints(&config.provider)
        .context("failed to resolve provider endpoints")?;
    let oauth = OAuthClientSettings {
        token_endpoint: config.oauth.token_endpoint.clone(),
        client_id: config.oauth.client_id.clone().unwrap_or_default(),
        client_secret: config.oauth.client_secret.clone().map(TokenSecret::new),
    };

    let cloud = Arc::new(ProviderClient::new(http.clone(), endpoints));
    let refresher = Arc::new(OAuthTokenClient::new(http, oauth));

    Ok(assemble_state(
        config,
        CheckRegistry::builtin(),
        cloud,
        refresher,
    ))
}

/// Build state around explicit collaborators.
pub fn assemble_state(
    config: Arc<Config>,
    registry: CheckRegistry,
    cloud: Arc<dyn CloudApi>,
    refresher: Arc<dyn TokenRefresher>,
) -> AppState {
    let credentials = CredentialStore::new();
    let mut tokens = TokenManager::new(credentials.clone(), refresher);
    if let Some(fallback) = &config.fallback {
        warn!(
            environment = %config.environment,
            "fallback credential configured; used when no session credential exists"
        );
        tokens = tokens.with_fallback(FallbackPolicy::new(
            fallback_credential(fallback),
            config.is_production(),
        ));
    }

    let runner = CheckRunner::new(Arc::new(registry), cloud);
    let dispatcher = JobDispatcher::new(
        Arc::new(
            InMemoryJobStore::new().with_retention(config.jobs.max_retained),
        ),
        tokens,
        runner,
        Aggregator::new(savings_table(&config)),
        DispatcherSettings {
            hard_timeout: config.jobs.hard_timeout,
        },
    );

    let rate_limiter = Arc::new(RunRateLimiter::new(
        config.rate_limit.max_runs,
        config.rate_limit.window,
    ));

    info!(
        jobs.hard_timeout = ?config.jobs.hard_timeout,
        jobs.max_retained = config.jobs.max_retained,
        rate_limit.max_runs = config.rate_limit.max_runs,
        rate_limit.window = ?config.rate_limit.window,
        savings.rate = config.savings.rate_per_finding,
        "audit services ready"
    );

    AppState {
        config,
        dispatcher,
        credentials,
        inventory: InventoryService::new(Arc::new(
            InMemoryInventoryStore::new(),
        )),
        rate_limiter,
    }
}

fn provider_endpoints(
    overrides: &ProviderConfig,
) -> Result<ProviderEndpoints, url::ParseError> {
    let mut endpoints = ProviderEndpoints::google()?;
    let pick = |slot: &mut url::Url, value: &Option<url::Url>| {
        if let Some(url) = value {
            *slot = url.clone();
        }
    };
    pick(&mut endpoints.compute, &overrides.compute);
    pick(&mut endpoints.storage, &overrides.storage);
    pick(&mut endpoints.monitoring, &overrides.monitoring);
    pick(&mut endpoints.resource_manager, &overrides.resource_manager);
    pick(&mut endpoints.iam, &overrides.iam);
    pick(&mut endpoints.security_center, &overrides.security_center);
    Ok(endpoints)
}

fn savings_table(config: &Config) -> SavingsTable {
    config.savings.ranges.iter().fold(
        SavingsTable::default().with_rate(config.savings.rate_per_finding),
        |table, (check_type, range)| {
            table.with_range(check_type.clone(), range.clone())
        },
    )
}

/// The fallback token is opaque and carries no expiry of its own.
fn fallback_credential(fallback: &FallbackConfig) -> Credential {
    Credential {
        access_token: TokenSecret::new(fallback.access_token.clone()),
        refresh_token: None,
        expiry: DateTime::<Utc>::MAX_UTC,
        scopes: fallback.scopes.clone(),
    }
}
