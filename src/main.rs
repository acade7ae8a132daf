//! gree-exporter - Prometheus exporter for Gree smart air conditioners

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gree_exporter::config::Config;
use gree_exporter::device::SimulatedFleet;
use gree_exporter::exporter::Exporter;
use gree_exporter::shutdown::shutdown_signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gree_exporter=info,tower_http=info".into()),
        )
        .init();

    tracing::info!("Starting gree-exporter...");

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        "Configuration loaded: port={}, discovery={}s, update={}s, wait={}s",
        config.port,
        config.discovery_interval,
        config.update_interval,
        config.wait_interval
    );

    let fleet = SimulatedFleet::new(config.fleet.clone());
    if fleet.is_empty() {
        tracing::warn!("No units configured under `fleet`; scans will find nothing");
    } else {
        tracing::info!("Simulated fleet with {} units", fleet.len());
    }

    let exporter = Exporter::new(&config, Arc::new(fleet))?;
    exporter.start().await?;

    tokio::select! {
        _ = exporter.serve_forever() => {}
        _ = shutdown_signal() => {}
    }

    exporter.stop().await;

    Ok(())
}
