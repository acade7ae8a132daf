//! Refresh loop: re-polls every bound unit and publishes its gauges

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::device::DeviceSession;
use crate::exporter::registry::DeviceRegistry;
use crate::metrics::GaugeSet;

/// Refresh-and-publish step for a single session, shared by both loops
#[derive(Clone)]
pub struct StateRefresher {
    gauges: Arc<GaugeSet>,
    wait_time: Duration,
}

impl StateRefresher {
    pub fn new(gauges: Arc<GaugeSet>, wait_time: Duration) -> Self {
        Self { gauges, wait_time }
    }

    /// Returns false when the unit could not be refreshed; its gauges then
    /// keep their previous values.
    pub async fn refresh(&self, session: &DeviceSession) -> bool {
        match session.refresh(self.wait_time).await {
            Ok(state) => {
                let written = self.gauges.record(session.mac(), &state);
                tracing::debug!(
                    "[Refresh] {} reported {} properties, {} exported",
                    session.mac(),
                    state.len(),
                    written
                );
                true
            }
            Err(e) => {
                tracing::warn!("[Refresh] Failed to update device data: {}", e);
                false
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSummary {
    pub refreshed: usize,
    pub failed: usize,
}

pub struct RefreshLoop {
    registry: DeviceRegistry,
    refresher: StateRefresher,
    interval: Duration,
}

impl RefreshLoop {
    pub fn new(registry: DeviceRegistry, refresher: StateRefresher, interval: Duration) -> Self {
        Self {
            registry,
            refresher,
            interval,
        }
    }

    /// Run until `cancel` fires. In-flight refreshes are dropped on cancel.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(
            "[Refresh] Starting state refresh (interval: {}s)",
            self.interval.as_secs()
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                summary = self.refresh_all() => {
                    tracing::debug!(
                        "[Refresh] Cycle done: {} refreshed, {} failed",
                        summary.refreshed,
                        summary.failed
                    );
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = time::sleep(self.interval) => {}
            }
        }

        tracing::info!("[Refresh] Stopped");
    }

    /// Refresh every registered unit concurrently
    pub async fn refresh_all(&self) -> RefreshSummary {
        let sessions = self.registry.snapshot().await;
        if sessions.is_empty() {
            return RefreshSummary::default();
        }

        let results = join_all(
            sessions
                .iter()
                .map(|session| self.refresher.refresh(session)),
        )
        .await;

        let refreshed = results.iter().filter(|ok| **ok).count();
        RefreshSummary {
            refreshed,
            failed: results.len() - refreshed,
        }
    }
}
