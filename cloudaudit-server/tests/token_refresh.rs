use std::{collections::HashMap, sync::Arc};

use anyhow::{Result, anyhow};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::{TimeDelta, Utc};
use cloudaudit_core::{
    AuthError,
    auth::{
        CredentialKey, OAuthClientSettings, OAuthTokenClient, TokenRefresher,
    },
};
use cloudaudit_model::{
    Credential, ProjectRef, SessionId, TokenSecret, routes::api,
};
use serde_json::{Value, json};
use tokio::sync::Mutex;

#[path = "support/mod.rs"]
mod support;

use support::{
    PROJECT, build_test_app_with, seed_credential, serve_on_loopback,
    storage_registry,
};

const CLIENT_ID: &str = "audit-client.apps.example";
const CLIENT_SECRET: &str = "client-secret";

type Forms = Arc<Mutex<Vec<HashMap<String, String>>>>;

/// Token endpoint that answers by refresh token: `1//good` is granted,
/// `1//revoked` is refused, `1//hollow` gets a grant without a token.
async fn token_endpoint(State(forms): State<Forms>, body: String) -> Response {
    let form: HashMap<String, String> =
        url::form_urlencoded::parse(body.as_bytes()).into_owned().collect();
    let refresh = form.get("refresh_token").cloned().unwrap_or_default();
    forms.lock().await.push(form);

    match refresh.as_str() {
        "1//good" => Json(json!({
            "access_token": "ya29.fresh",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/cloud-platform",
            "token_type": "Bearer",
        }))
        .into_response(),
        "1//hollow" => Json(json!({ "access_token": "" })).into_response(),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant" })),
        )
            .into_response(),
    }
}

async fn start_token_endpoint() -> Result<(OAuthTokenClient, Forms)> {
    let forms = Forms::default();
    let router = Router::new()
        .route("/token", post(token_endpoint))
        .with_state(Arc::clone(&forms));
    let base = serve_on_loopback(router).await?;

    let client = OAuthTokenClient::new(
        reqwest::Client::new(),
        OAuthClientSettings {
            token_endpoint: base.join("token")?,
            client_id: CLIENT_ID.into(),
            client_secret: Some(TokenSecret::new(CLIENT_SECRET)),
        },
    );
    Ok((client, forms))
}

#[tokio::test]
async fn refresh_posts_the_grant_form() -> Result<()> {
    let (client, forms) = start_token_endpoint().await?;

    let grant = client.refresh(&TokenSecret::new("1//good")).await?;
    assert_eq!(grant.access_token, "ya29.fresh");
    assert_eq!(grant.expires_in, 3599);
    assert!(grant.refresh_token.is_none());

    let forms = forms.lock().await;
    assert_eq!(forms.len(), 1);
    let form = &forms[0];
    assert_eq!(
        form.get("grant_type").map(String::as_str),
        Some("refresh_token")
    );
    assert_eq!(form.get("client_id").map(String::as_str), Some(CLIENT_ID));
    assert_eq!(
        form.get("client_secret").map(String::as_str),
        Some(CLIENT_SECRET)
    );
    assert_eq!(
        form.get("refresh_token").map(String::as_str),
        Some("1//good")
    );
    Ok(())
}

#[tokio::test]
async fn rejected_refresh_keeps_the_status() -> Result<()> {
    let (client, _) = start_token_endpoint().await?;

    let err = client
        .refresh(&TokenSecret::new("1//revoked"))
        .await
        .expect_err("revoked token");
    match err {
        AuthError::RefreshRejected { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("invalid_grant"));
        }
        other => panic!("expected a rejection, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn grant_without_access_token_is_malformed() -> Result<()> {
    let (client, _) = start_token_endpoint().await?;

    let err = client
        .refresh(&TokenSecret::new("1//hollow"))
        .await
        .expect_err("empty token");
    assert!(matches!(err, AuthError::MalformedGrant(_)));
    Ok(())
}

fn expired_credential(refresh: &str) -> Credential {
    Credential {
        access_token: TokenSecret::new("ya29.stale"),
        refresh_token: Some(TokenSecret::new(refresh)),
        expiry: Utc::now() - TimeDelta::minutes(5),
        scopes: vec!["https://www.googleapis.com/auth/cloud-platform".into()],
    }
}

fn stored_key() -> Result<CredentialKey> {
    let project =
        ProjectRef::new(PROJECT).ok_or_else(|| anyhow!("blank project"))?;
    Ok(CredentialKey::new(SessionId::anonymous(), project))
}

#[tokio::test]
async fn run_refreshes_an_expired_credential_first() -> Result<()> {
    let (client, forms) = start_token_endpoint().await?;
    let refresher: Arc<dyn TokenRefresher> = Arc::new(client);
    let app = build_test_app_with(storage_registry(), refresher, |_| {})?;
    seed_credential(&app, expired_credential("1//good"))?;

    let response = app
        .server
        .post(api::audits::RUN)
        .json(&json!({ "projectId": PROJECT, "category": "storage" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["results"]["summary"]["totalChecks"], 3);

    assert_eq!(forms.lock().await.len(), 1);
    let stored = app
        .state
        .credentials
        .get(&stored_key()?)
        .ok_or_else(|| anyhow!("credential was dropped"))?;
    assert_eq!(stored.access_token.expose(), "ya29.fresh");
    assert!(stored.expiry > Utc::now());
    assert_eq!(
        stored.refresh_token.as_ref().map(TokenSecret::expose),
        Some("1//good")
    );
    Ok(())
}

#[tokio::test]
async fn refused_refresh_fails_the_run_and_keeps_the_credential() -> Result<()> {
    let (client, _) = start_token_endpoint().await?;
    let app =
        build_test_app_with(storage_registry(), Arc::new(client), |_| {})?;
    seed_credential(&app, expired_credential("1//revoked"))?;

    let response = app
        .server
        .post(api::audits::RUN)
        .json(&json!({ "projectId": PROJECT, "category": "storage" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let stored = app
        .state
        .credentials
        .get(&stored_key()?)
        .ok_or_else(|| anyhow!("credential was dropped"))?;
    assert_eq!(stored.access_token.expose(), "ya29.stale");
    Ok(())
}
