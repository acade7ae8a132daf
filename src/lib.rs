//! gree-exporter - Prometheus exporter for Gree smart air conditioners
//!
//! Discovers units on the local network, binds them, polls their operating
//! state and republishes every property as a gauge labeled by the unit's
//! mac address.
//!
//! - [`exporter`] - lifecycle of the discovery and refresh loops
//! - [`device`] - protocol seams and bound device sessions
//! - [`metrics`] - property gauges and text exposition
//! - [`api`] - HTTP endpoint (`/metrics`, `/health`, `/api/devices`)
//! - [`config`] - environment and file configuration

pub mod api;
pub mod config;
pub mod device;
pub mod error;
pub mod exporter;
pub mod metrics;
pub mod models;
pub mod shutdown;
