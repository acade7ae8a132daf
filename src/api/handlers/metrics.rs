//! Metrics exposition handler

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};

use crate::api::ApiState;
use crate::error::ExporterError;

/// GET /metrics - Current gauge values in the text exposition format
pub async fn get_metrics(State(state): State<ApiState>) -> Result<impl IntoResponse, ExporterError> {
    let body = state.gauges.encode()?;
    Ok(([(header::CONTENT_TYPE, state.gauges.content_type())], body))
}
