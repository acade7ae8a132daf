//! Discovery loop: scans the network and binds units not yet registered
//!
//! Every cycle scans, binds all new units concurrently, waits for every bind
//! to settle, then sleeps. A unit that fails to bind is retried on the next
//! cycle for as long as scans keep reporting it.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::device::{DeviceProtocol, DeviceSession};
use crate::exporter::refresh::StateRefresher;
use crate::exporter::registry::DeviceRegistry;
use crate::models::DeviceInfo;

/// Extra time a scan gets beyond its own listen window
const SCAN_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindOutcome {
    Bound,
    AlreadyBound,
    Failed,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiscoverySummary {
    /// Distinct units reported by the scan
    pub found: usize,
    pub bound: usize,
    pub already_bound: usize,
    pub failed: usize,
}

pub struct DiscoveryLoop {
    protocol: Arc<dyn DeviceProtocol>,
    registry: DeviceRegistry,
    refresher: StateRefresher,
    interval: Duration,
    wait_time: Duration,
}

impl DiscoveryLoop {
    pub fn new(
        protocol: Arc<dyn DeviceProtocol>,
        registry: DeviceRegistry,
        refresher: StateRefresher,
        interval: Duration,
        wait_time: Duration,
    ) -> Self {
        Self {
            protocol,
            registry,
            refresher,
            interval,
            wait_time,
        }
    }

    /// Run until `cancel` fires. In-flight scans and binds are dropped on
    /// cancel; nothing is registered for a bind that did not complete.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(
            "[Discovery] Starting {} discovery (interval: {}s)",
            self.protocol.name(),
            self.interval.as_secs()
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                summary = self.discover() => {
                    tracing::debug!(
                        "[Discovery] Cycle done: {} found, {} bound, {} known, {} failed",
                        summary.found,
                        summary.bound,
                        summary.already_bound,
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

        tracing::info!("[Discovery] Stopped");
    }

    /// One scan-and-bind cycle
    pub async fn discover(&self) -> DiscoverySummary {
        let scan = time::timeout(
            self.wait_time + SCAN_GRACE,
            self.protocol.scan(self.wait_time),
        )
        .await;

        let devices = match scan {
            Ok(Ok(devices)) => devices,
            Ok(Err(e)) => {
                tracing::warn!("[Discovery] {}", e);
                return DiscoverySummary::default();
            }
            Err(_) => {
                tracing::warn!(
                    "[Discovery] Network scan did not finish within {:?}",
                    self.wait_time + SCAN_GRACE
                );
                return DiscoverySummary::default();
            }
        };

        let mut seen = HashSet::new();
        let candidates: Vec<DeviceInfo> = devices
            .into_iter()
            .filter(|info| seen.insert(info.mac.clone()))
            .collect();

        let outcomes = join_all(candidates.into_iter().map(|info| self.bind(info))).await;

        let mut summary = DiscoverySummary {
            found: outcomes.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                BindOutcome::Bound => summary.bound += 1,
                BindOutcome::AlreadyBound => summary.already_bound += 1,
                BindOutcome::Failed => summary.failed += 1,
            }
        }
        summary
    }

    /// Bind a unit, register it and publish its first state
    async fn bind(&self, info: DeviceInfo) -> BindOutcome {
        if self.registry.contains(&info.mac).await {
            return BindOutcome::AlreadyBound;
        }

        let client = self.protocol.connect(&info);
        let session = match DeviceSession::bind(info, client, self.wait_time).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("[Discovery] Unable to bind to a device: {}", e);
                return BindOutcome::Failed;
            }
        };

        let Some(session) = self.registry.insert(session).await else {
            return BindOutcome::AlreadyBound;
        };

        tracing::info!(
            "[Discovery] Bound device {} at {}:{}",
            session.mac(),
            session.info().ip,
            session.info().port
        );
        self.refresher.refresh(&session).await;

        BindOutcome::Bound
    }
}
