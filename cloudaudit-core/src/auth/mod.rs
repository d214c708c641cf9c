//! Provider credential lifecycle: session-scoped cache, refresh grants and
//! the lazy-refresh [`TokenManager`].

mod manager;
mod refresher;
mod store;

pub use manager::{FallbackPolicy, TokenManager};
pub use refresher::{
    DEFAULT_GRANT_LIFETIME_SECS, OAuthClientSettings, OAuthTokenClient,
    RefreshGrant, TokenRefresher,
};
#[cfg(test)]
pub use refresher::MockTokenRefresher;
pub use store::{CredentialKey, CredentialStore};
