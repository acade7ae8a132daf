//! HTTP handlers module

mod devices;
mod metrics;

pub use self::devices::*;
pub use self::metrics::*;

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;

use crate::api::ApiState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub devices: usize,
}

/// Health check handler
pub async fn health_check(State(state): State<ApiState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "gree-exporter".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        devices: state.registry.len().await,
    })
}
