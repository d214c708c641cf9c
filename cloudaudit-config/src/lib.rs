//! Configuration for the cloudaudit server and CLI.
//!
//! Values are layered: a `.env` file (loaded into the process environment),
//! then an optional TOML file, then environment variables, which win. The
//! composed [`Config`] passes through [`validation::apply_guard_rails`]
//! before it is returned.

#![allow(missing_docs)]

pub mod loader;
pub mod models;
pub mod sources;
pub mod validation;

pub use loader::{
    ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions,
};
pub use models::{
    Config, ConfigMetadata, CorsConfig, Environment, FallbackConfig,
    JobsConfig, OAuthConfig, PollerConfig, ProviderConfig, RateLimitConfig,
    SavingsConfig, ServerConfig,
};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
