//! Exporter: lifecycle of the discovery loop, refresh loop and HTTP endpoint
//!
//! - `registry`: concurrency-safe map of bound sessions
//! - `discovery`: periodic scan and bind
//! - `refresh`: periodic state refresh and gauge publishing
//!
//! States move `Idle → Running → Stopping → Idle`.

pub mod discovery;
pub mod refresh;
pub mod registry;

pub use discovery::{DiscoveryLoop, DiscoverySummary};
pub use refresh::{RefreshLoop, RefreshSummary, StateRefresher};
pub use registry::DeviceRegistry;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiState, MetricsServer};
use crate::config::{Config, Timing};
use crate::device::DeviceProtocol;
use crate::error::ExporterError;
use crate::metrics::GaugeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExporterState {
    Idle,
    Running,
    Stopping,
}

struct Running {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    server: MetricsServer,
}

enum Lifecycle {
    Idle,
    Running(Running),
    Stopping,
}

pub struct Exporter {
    listen_addr: String,
    timing: Timing,
    protocol: Arc<dyn DeviceProtocol>,
    registry: DeviceRegistry,
    gauges: Arc<GaugeSet>,
    lifecycle: Mutex<Lifecycle>,
    /// true once stop() has run; watched by serve_forever()
    stopped: watch::Sender<bool>,
}

impl Exporter {
    pub fn new(config: &Config, protocol: Arc<dyn DeviceProtocol>) -> Result<Self, ExporterError> {
        let gauges = Arc::new(GaugeSet::new(&config.namespace)?);
        let (stopped, _) = watch::channel(false);

        Ok(Self {
            listen_addr: config.listen_addr(),
            timing: config.timing(),
            protocol,
            registry: DeviceRegistry::new(),
            gauges,
            lifecycle: Mutex::new(Lifecycle::Idle),
            stopped,
        })
    }

    /// Start the HTTP endpoint and both loops. Returns the bound address.
    pub async fn start(&self) -> Result<SocketAddr, ExporterError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if !matches!(*lifecycle, Lifecycle::Idle) {
            return Err(ExporterError::AlreadyRunning);
        }

        let server = MetricsServer::start(
            &self.listen_addr,
            ApiState::new(self.gauges.clone(), self.registry.clone()),
        )
        .await?;
        let addr = server.local_addr();

        let refresher = StateRefresher::new(self.gauges.clone(), self.timing.wait_time);
        let discovery = DiscoveryLoop::new(
            self.protocol.clone(),
            self.registry.clone(),
            refresher.clone(),
            self.timing.discovery_interval,
            self.timing.wait_time,
        );
        let refresh = RefreshLoop::new(
            self.registry.clone(),
            refresher,
            self.timing.update_interval,
        );

        let cancel = CancellationToken::new();
        let tasks = vec![
            tokio::spawn(discovery.run(cancel.clone())),
            tokio::spawn(refresh.run(cancel.clone())),
        ];

        self.stopped.send_replace(false);
        *lifecycle = Lifecycle::Running(Running {
            cancel,
            tasks,
            server,
        });

        tracing::info!("[Exporter] Running, metrics at http://{}/metrics", addr);
        Ok(addr)
    }

    /// Wait until the exporter has been stopped. Does no polling itself.
    pub async fn serve_forever(&self) {
        let mut stopped = self.stopped.subscribe();
        // Sender lives in self, so the channel cannot close while we wait
        let _ = stopped.wait_for(|stopped| *stopped).await;
    }

    /// Cancel both loops, wait for them to exit, then close the endpoint.
    /// A no-op when not running.
    pub async fn stop(&self) {
        let running = {
            let mut lifecycle = self.lifecycle.lock().await;
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopping) {
                Lifecycle::Running(running) => running,
                other => {
                    *lifecycle = other;
                    return;
                }
            }
        };

        tracing::info!("[Exporter] Stopping...");
        self.stopped.send_replace(true);
        running.cancel.cancel();

        for task in running.tasks {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    tracing::error!("[Exporter] Background loop panicked: {}", e);
                }
            }
        }

        running.server.close().await;

        *self.lifecycle.lock().await = Lifecycle::Idle;
        tracing::info!("[Exporter] Stopped");
    }

    pub async fn state(&self) -> ExporterState {
        match *self.lifecycle.lock().await {
            Lifecycle::Idle => ExporterState::Idle,
            Lifecycle::Running(_) => ExporterState::Running,
            Lifecycle::Stopping => ExporterState::Stopping,
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn gauges(&self) -> &GaugeSet {
        &self.gauges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::fake::FakeNetwork;
    use crate::models::DeviceState;
    use std::time::Duration;
    use tokio::time;

    fn config() -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            // ephemeral port; load() would map 0 to the default
            port: 0,
            ..Config::default()
        }
    }

    fn exporter(network: &FakeNetwork, timing: Timing) -> Exporter {
        let mut exporter = Exporter::new(&config(), Arc::new(network.clone())).unwrap();
        exporter.timing = timing;
        exporter
    }

    fn fast() -> Timing {
        Timing {
            discovery_interval: Duration::from_millis(40),
            update_interval: Duration::from_millis(40),
            wait_time: Duration::from_millis(50),
        }
    }

    async fn wait_until_bound(exporter: &Exporter, mac: &str) {
        time::timeout(Duration::from_secs(2), async {
            while !exporter.registry().contains(mac).await {
                time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_start_then_stop_terminates_loops() {
        let network = FakeNetwork::new();
        network.add_unit("AA:BB:CC:DD:EE:FF", DeviceState::new().with("power", 1));
        let exporter = exporter(&network, fast());
        assert_eq!(exporter.state().await, ExporterState::Idle);

        let addr = exporter.start().await.unwrap();
        assert_eq!(exporter.state().await, ExporterState::Running);
        wait_until_bound(&exporter, "AA:BB:CC:DD:EE:FF").await;

        time::timeout(Duration::from_secs(2), exporter.stop()).await.unwrap();
        assert_eq!(exporter.state().await, ExporterState::Idle);

        let scans = network.scans();
        let refreshes = network.total_refresh_calls();
        time::sleep(Duration::from_millis(150)).await;
        assert_eq!(network.scans(), scans);
        assert_eq!(network.total_refresh_calls(), refreshes);

        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_stop_while_device_hangs() {
        let network = FakeNetwork::new();
        network.add_unit("AA:BB:CC:DD:EE:FF", DeviceState::new());
        network.hang("AA:BB:CC:DD:EE:FF");
        let exporter = exporter(
            &network,
            Timing {
                wait_time: Duration::from_secs(30),
                ..fast()
            },
        );

        exporter.start().await.unwrap();
        time::sleep(Duration::from_millis(50)).await;
        time::timeout(Duration::from_secs(2), exporter.stop()).await.unwrap();
        assert!(exporter.registry().is_empty().await);
    }

    #[tokio::test]
    async fn test_serve_forever_returns_after_stop() {
        let network = FakeNetwork::new();
        let exporter = Arc::new(exporter(&network, fast()));
        exporter.start().await.unwrap();

        let waiter = {
            let exporter = exporter.clone();
            tokio::spawn(async move { exporter.serve_forever().await })
        };
        time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        exporter.stop().await;
        time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_double_start_and_double_stop() {
        let network = FakeNetwork::new();
        let exporter = exporter(&network, fast());

        exporter.stop().await;
        exporter.start().await.unwrap();
        assert!(matches!(
            exporter.start().await,
            Err(ExporterError::AlreadyRunning)
        ));
        exporter.stop().await;
        exporter.stop().await;
        assert_eq!(exporter.state().await, ExporterState::Idle);
    }

    #[tokio::test]
    async fn test_metrics_endpoint_serves_gauges() {
        let network = FakeNetwork::new();
        network.add_unit(
            "AA:BB:CC:DD:EE:FF",
            DeviceState::new()
                .with("power", 1)
                .with("target_temperature", 24)
                .with("mode", "cool"),
        );
        let exporter = exporter(&network, fast());
        let addr = exporter.start().await.unwrap();
        wait_until_bound(&exporter, "AA:BB:CC:DD:EE:FF").await;
        assert_eq!(exporter.gauges().value("power", "AA:BB:CC:DD:EE:FF"), Some(1.0));

        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{}/metrics", addr))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        let body = response.text().await.unwrap();
        assert!(body.contains("gree_power{mac=\"AA:BB:CC:DD:EE:FF\"} 1"));
        assert!(body.contains("gree_target_temperature{mac=\"AA:BB:CC:DD:EE:FF\"} 24"));
        assert!(!body.contains("gree_mode{"));

        let health: serde_json::Value = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "ok");
        assert_eq!(health["devices"], 1);

        let devices: serde_json::Value = client
            .get(format!("http://{}/api/devices", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(devices[0]["mac"], "AA:BB:CC:DD:EE:FF");
        assert_eq!(devices[0]["state"]["mode"], "cool");

        let device: serde_json::Value = client
            .get(format!("http://{}/api/devices/AA:BB:CC:DD:EE:FF", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(device["ip"], "192.168.1.10");
        assert_eq!(device["state"]["target_temperature"], 24);

        let missing = client
            .get(format!("http://{}/api/devices/11:22:33:44:55:66", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

        drop(client);
        exporter.stop().await;
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let network = FakeNetwork::new();
        let exporter = exporter(&network, fast());

        exporter.start().await.unwrap();
        exporter.stop().await;
        exporter.start().await.unwrap();
        assert_eq!(exporter.state().await, ExporterState::Running);
        exporter.stop().await;
    }
}
