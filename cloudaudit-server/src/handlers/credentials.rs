use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};
use cloudaudit_core::{ValidationError, auth::CredentialKey};
use cloudaudit_model::{Credential, CredentialUpsert, ProjectRef};
use tracing::info;

use super::session_from;
use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

fn credential_key(
    headers: &HeaderMap,
    project: String,
) -> Result<CredentialKey, ValidationError> {
    let project =
        ProjectRef::new(project).ok_or(ValidationError::MissingProject)?;
    Ok(CredentialKey::new(session_from(headers), project))
}

/// Seed the session's credential for a project.
pub async fn put_credential(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(project): Path<String>,
    payload: Result<Json<CredentialUpsert>, JsonRejection>,
) -> AppResult<StatusCode> {
    let Json(body) =
        payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    if body.access_token.is_empty() {
        return Err(ValidationError::InvalidField {
            field: "accessToken",
            message: "must not be empty".into(),
        }
        .into());
    }

    let key = credential_key(&headers, project)?;
    let credential = Credential::from(body);
    info!(
        session = %key.session,
        project = %key.project,
        expiry = %credential.expiry,
        refreshable = credential.can_refresh(),
        "credential stored"
    );
    let replaced = state.credentials.put(key, credential);

    Ok(if replaced.is_some() {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::CREATED
    })
}

pub async fn delete_credential(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(project): Path<String>,
) -> AppResult<StatusCode> {
    let key = credential_key(&headers, project)?;
    match state.credentials.invalidate(&key) {
        Some(_) => {
            info!(session = %key.session, project = %key.project, "credential removed");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(AppError::not_found(format!(
            "No credential stored for project {}",
            key.project
        ))),
    }
}
