use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use cloudaudit_model::{InventoryCommand, InventoryResponse, InventorySnapshot};
use tracing::debug;

use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

/// Apply one inventory action. Writes are best-effort: a store failure is
/// reported through `persisted: false` rather than an error status.
pub async fn audit_inventory(
    State(state): State<AppState>,
    payload: Result<Json<InventoryCommand>, JsonRejection>,
) -> AppResult<Json<InventoryResponse>> {
    let Json(command) =
        payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    debug!(?command, "inventory command");

    let response = state.inventory.handle(command).await?;
    Ok(Json(response))
}

pub async fn inventory_snapshot(
    State(state): State<AppState>,
) -> AppResult<Json<InventorySnapshot>> {
    Ok(Json(state.inventory.snapshot().await?))
}
