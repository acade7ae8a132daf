//! Error handling module

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Failure of a bind or refresh against one unit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("device {mac} is not bound")]
    NotBound { mac: String },

    #[error("device {mac} did not respond within {wait:?}")]
    Timeout { mac: String, wait: Duration },
}

impl DeviceError {
    pub fn mac(&self) -> &str {
        match self {
            DeviceError::NotBound { mac } | DeviceError::Timeout { mac, .. } => mac,
        }
    }
}

/// Network scan could not be completed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("network scan failed: {0}")]
pub struct ScanError(pub String);

/// Reported value has no numeric gauge representation
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("property value of type {kind} cannot be exported as a gauge")]
pub struct UnsupportedPropertyType {
    pub kind: &'static str,
}

#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Exporter is already running")]
    AlreadyRunning,
}

impl IntoResponse for ExporterError {
    fn into_response(self) -> Response {
        let status = match &self {
            ExporterError::NotFound(_) => StatusCode::NOT_FOUND,
            ExporterError::AlreadyRunning => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
