//! Device status handlers

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

use crate::api::ApiState;
use crate::error::ExporterError;

/// GET /api/devices - Bound units with their last reported state
pub async fn list_devices(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.registry.statuses().await)
}

/// GET /api/devices/:mac - One bound unit
pub async fn get_device(
    State(state): State<ApiState>,
    Path(mac): Path<String>,
) -> Result<impl IntoResponse, ExporterError> {
    let session = state
        .registry
        .get(&mac)
        .await
        .ok_or_else(|| ExporterError::NotFound(format!("Device {} is not bound", mac)))?;

    Ok(Json(session.status().await))
}
