//! # cloudaudit core
//!
//! Orchestration engine behind the cloudaudit server and CLI.
//!
//! ## Overview
//!
//! - **Token lifecycle**: a session-scoped [`auth::CredentialStore`] and the
//!   lazily refreshing [`auth::TokenManager`]
//! - **Check execution**: the category registry, the sequential
//!   [`checks::CheckRunner`] and the built-in check-sets
//! - **Aggregation**: normalisation of raw check output into findings and
//!   summaries, savings estimates and report rendering
//! - **Jobs**: the job store and the [`jobs::JobDispatcher`] that owns the
//!   `pending → running → completed | failed` state machine
//! - **Client**: the [`client::StatusPoller`] and
//!   [`client::BatchScheduler`] used to drive a remote server
//! - **Inventory**: the admin control plane for per-category status
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use cloudaudit_core::{
//!     aggregate::Aggregator,
//!     auth::{CredentialStore, OAuthClientSettings, OAuthTokenClient, TokenManager},
//!     checks::{CheckRegistry, CheckRunner},
//!     jobs::{DispatcherSettings, InMemoryJobStore, JobDispatcher, RunRequest},
//!     provider::{ProviderClient, ProviderEndpoints},
//! };
//! use cloudaudit_model::SessionId;
//!
//! async fn audit_storage(
//!     oauth: OAuthClientSettings,
//! ) -> Result<(), Box<dyn std::error::Error>> {
//!     let http = reqwest::Client::new();
//!     let tokens = TokenManager::new(
//!         CredentialStore::default(),
//!         Arc::new(OAuthTokenClient::new(http.clone(), oauth)),
//!     );
//!     let runner = CheckRunner::new(
//!         Arc::new(CheckRegistry::builtin()),
//!         Arc::new(ProviderClient::new(http, ProviderEndpoints::google()?)),
//!     );
//!     let dispatcher = JobDispatcher::new(
//!         Arc::new(InMemoryJobStore::new()),
//!         tokens,
//!         runner,
//!         Aggregator::default(),
//!         DispatcherSettings::default(),
//!     );
//!
//!     let request =
//!         RunRequest::parse(SessionId::anonymous(), Some("my-project"), Some("storage"))?;
//!     let outcome = dispatcher.run(request).await?;
//!     println!("job {} is {}", outcome.job.id, outcome.job.status);
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]

pub mod aggregate;
pub mod auth;
pub mod checks;
pub mod client;
pub mod error;
pub mod inventory;
pub mod jobs;
pub mod provider;

pub use error::{
    AuditError, AuthError, CheckError, CheckErrorKind, ClientError, Result,
    ValidationError,
};
