use std::{fmt, sync::Arc};

use cloudaudit_config::Config;
use cloudaudit_core::{
    auth::CredentialStore, inventory::InventoryService, jobs::JobDispatcher,
};

use super::rate_limit::RunRateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub dispatcher: JobDispatcher,
    /// Same store the dispatcher's token manager reads from.
    pub credentials: CredentialStore,
    pub inventory: InventoryService,
    pub rate_limiter: Arc<RunRateLimiter>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("environment", &self.config.environment)
            .field("credentials", &self.credentials)
            .field("rate_limiter", &self.rate_limiter)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn config(&self) -> &Config {
        &self.config
    }
}
