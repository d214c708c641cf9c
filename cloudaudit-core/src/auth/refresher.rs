use std::fmt;

use async_trait::async_trait;
use cloudaudit_model::TokenSecret;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::AuthError;

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_GRANT_LIFETIME_SECS: i64 = 3600;

fn default_expires_in() -> i64 {
    DEFAULT_GRANT_LIFETIME_SECS
}

/// Successful `grant_type=refresh_token` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshGrant {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    /// Present only when the provider rotates refresh tokens.
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Exchanges a refresh token for a new access token.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(
        &self,
        refresh_token: &TokenSecret,
    ) -> Result<RefreshGrant, AuthError>;
}

#[derive(Clone)]
pub struct OAuthClientSettings {
    pub token_endpoint: Url,
    pub client_id: String,
    pub client_secret: Option<TokenSecret>,
}

impl fmt::Debug for OAuthClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthClientSettings")
            .field("token_endpoint", &self.token_endpoint.as_str())
            .field("client_id", &self.client_id)
            .field("has_client_secret", &self.client_secret.is_some())
            .finish()
    }
}

/// Form-encoded refresh grant against the provider token endpoint.
#[derive(Debug, Clone)]
pub struct OAuthTokenClient {
    http: reqwest::Client,
    settings: OAuthClientSettings,
}

impl OAuthTokenClient {
    pub fn new(http: reqwest::Client, settings: OAuthClientSettings) -> Self {
        Self { http, settings }
    }
}

#[async_trait]
impl TokenRefresher for OAuthTokenClient {
    async fn refresh(
        &self,
        refresh_token: &TokenSecret,
    ) -> Result<RefreshGrant, AuthError> {
        let secret = self
            .settings
            .client_secret
            .as_ref()
            .ok_or(AuthError::NotConfigured("client secret is missing"))?;
        if self.settings.client_id.trim().is_empty() {
            return Err(AuthError::NotConfigured("client id is missing"));
        }

        let form = [
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", secret.expose()),
            ("refresh_token", refresh_token.expose()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http
            .post(self.settings.token_endpoint.clone())
            .form(&form)
            .send()
            .await
            .map_err(|err| AuthError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = body.chars().take(200).collect::<String>();
            return Err(AuthError::RefreshRejected {
                status: status.as_u16(),
                message,
            });
        }

        let grant: RefreshGrant = response
            .json()
            .await
            .map_err(|err| AuthError::MalformedGrant(err.to_string()))?;
        if grant.access_token.trim().is_empty() {
            return Err(AuthError::MalformedGrant(
                "grant carried no access_token".into(),
            ));
        }

        debug!(expires_in = grant.expires_in, "refresh grant accepted");
        Ok(grant)
    }
}
