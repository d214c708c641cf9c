pub mod admin;
pub mod audits;
pub mod credentials;
pub mod health;

use axum::http::HeaderMap;
use cloudaudit_core::ValidationError;
use cloudaudit_model::{JobId, SessionId, routes::api::headers::SESSION};

/// Session the request acts for; requests without the header share the
/// anonymous session.
pub(crate) fn session_from(headers: &HeaderMap) -> SessionId {
    headers
        .get(SESSION)
        .and_then(|value| value.to_str().ok())
        .map(SessionId::new)
        .unwrap_or_default()
}

pub(crate) fn parse_job_id(raw: &str) -> Result<JobId, ValidationError> {
    JobId::parse(raw.trim())
        .ok_or_else(|| ValidationError::InvalidJobId(raw.to_string()))
}
