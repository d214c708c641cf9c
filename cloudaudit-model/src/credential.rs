use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Bearer/refresh token material. Wiped on drop and never printed.
#[derive(
    Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop,
)]
#[serde(transparent)]
pub struct TokenSecret(String);

impl TokenSecret {
    pub fn new(raw: impl Into<String>) -> Self {
        TokenSecret(raw.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for TokenSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenSecret(***)")
    }
}

/// Access/refresh token pair used to call the provider management APIs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: TokenSecret,
    pub refresh_token: Option<TokenSecret>,
    pub expiry: DateTime<Utc>,
    pub scopes: Vec<String>,
}

impl Credential {
    /// A credential is usable while it carries an access token and has not
    /// reached its expiry.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && self.expiry > now
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_ref().is_some_and(|t| !t.is_empty())
    }

    /// Build the replacement credential after a successful refresh grant.
    /// Scopes are carried over; the refresh token is kept unless the grant
    /// rotated it.
    pub fn refreshed(
        &self,
        access_token: TokenSecret,
        rotated_refresh: Option<TokenSecret>,
        expires_in_secs: i64,
        now: DateTime<Utc>,
    ) -> Credential {
        Credential {
            access_token,
            refresh_token: rotated_refresh.or_else(|| self.refresh_token.clone()),
            expiry: now + Duration::seconds(expires_in_secs),
            scopes: self.scopes.clone(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &self.access_token)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expiry", &self.expiry)
            .field("scopes", &self.scopes)
            .finish()
    }
}
