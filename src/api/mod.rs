//! API module - HTTP handlers, routes and the metrics server

pub mod handlers;
mod server;

pub use self::server::MetricsServer;

use std::sync::Arc;
use std::time::Instant;

use axum::{routing::get, Router};

use crate::exporter::DeviceRegistry;
use crate::metrics::GaugeSet;

/// State shared by the HTTP handlers
#[derive(Clone)]
pub struct ApiState {
    pub gauges: Arc<GaugeSet>,
    pub registry: DeviceRegistry,
    pub start_time: Instant,
}

impl ApiState {
    pub fn new(gauges: Arc<GaugeSet>, registry: DeviceRegistry) -> Self {
        Self {
            gauges,
            registry,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

pub fn routes() -> Router<ApiState> {
    Router::new()
        // Scrape target
        .route("/metrics", get(handlers::get_metrics))
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::health_check))
        // Devices
        .route("/api/devices", get(handlers::list_devices))
        .route("/api/devices/:mac", get(handlers::get_device))
}
