use std::{fmt, sync::Arc};

use chrono::Utc;
use cloudaudit_model::{Credential, TokenSecret};
use tracing::{debug, info, instrument, warn};

use super::{CredentialKey, CredentialStore, TokenRefresher};
use crate::error::AuthError;

/// Privileged service-account style credential. Only consulted outside
/// production and only when the store holds nothing for the requested key.
#[derive(Clone)]
pub struct FallbackPolicy {
    credential: Credential,
    production: bool,
}

impl FallbackPolicy {
    pub fn new(credential: Credential, production: bool) -> Self {
        Self {
            credential,
            production,
        }
    }

    fn usable(&self) -> Option<&Credential> {
        (!self.production).then_some(&self.credential)
    }
}

impl fmt::Debug for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackPolicy")
            .field("production", &self.production)
            .finish_non_exhaustive()
    }
}

/// Acquires, validates and lazily refreshes provider credentials.
#[derive(Clone)]
pub struct TokenManager {
    store: CredentialStore,
    refresher: Arc<dyn TokenRefresher>,
    fallback: Option<FallbackPolicy>,
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("store", &self.store)
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    pub fn new(
        store: CredentialStore,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        Self {
            store,
            refresher,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Return a usable credential for `key`, refreshing it in place when it
    /// has expired and a refresh token is available.
    ///
    /// The cache is only written after a successful refresh; every failure
    /// leaves it untouched.
    #[instrument(skip(self), fields(session = %key.session, project = %key.project))]
    pub async fn get_credential(
        &self,
        key: &CredentialKey,
    ) -> Result<Credential, AuthError> {
        let Some(stored) = self.store.get(key) else {
            return self.fallback_for(key);
        };

        if stored.is_valid_at(Utc::now()) {
            return Ok(stored);
        }

        let Some(refresh_token) =
            stored.refresh_token.clone().filter(|t| !t.is_empty())
        else {
            warn!("stored credential expired and cannot be refreshed");
            return Err(AuthError::RequiresReauthentication {
                project: key.project.to_string(),
            });
        };

        debug!("stored credential expired; refreshing");
        let grant = self.refresher.refresh(&refresh_token).await?;
        let refreshed = stored.refreshed(
            TokenSecret::new(grant.access_token),
            grant.refresh_token.map(TokenSecret::new),
            grant.expires_in,
            Utc::now(),
        );

        self.store.put(key.clone(), refreshed.clone());
        info!(expiry = %refreshed.expiry, "credential refreshed");
        Ok(refreshed)
    }

    fn fallback_for(
        &self,
        key: &CredentialKey,
    ) -> Result<Credential, AuthError> {
        let fallback = self
            .fallback
            .as_ref()
            .and_then(FallbackPolicy::usable)
            .ok_or_else(|| AuthError::MissingCredential {
                project: key.project.to_string(),
            })?;

        if !fallback.is_valid_at(Utc::now()) {
            return Err(AuthError::RequiresReauthentication {
                project: key.project.to_string(),
            });
        }

        debug!("using fallback credential");
        Ok(fallback.clone())
    }
}
