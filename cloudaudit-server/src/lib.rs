//! HTTP surface of the cloud audit service.
//!
//! The binary in `main.rs` loads configuration, builds an [`AppState`] via
//! [`infra::bootstrap::build_state`] and serves [`routes::create_router`].

pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;
