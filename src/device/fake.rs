use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::device::{DeviceClient, DeviceProtocol};
use crate::error::{DeviceError, ScanError};
use crate::models::{DeviceInfo, DeviceState};

#[derive(Default)]
struct FakeInner {
    units: Vec<DeviceInfo>,
    states: HashMap<String, DeviceState>,
    bind_failures: HashSet<String>,
    refresh_failures: HashSet<String>,
    hanging: HashSet<String>,
    bind_calls: HashMap<String, usize>,
    refresh_calls: HashMap<String, usize>,
    scan_fails: bool,
}

enum Reply<T> {
    Ready(Result<T, DeviceError>),
    Hang,
}

/// Scripted in-memory network used by tests to drive the poll loops.
#[derive(Clone, Default)]
pub struct FakeNetwork {
    inner: Arc<Mutex<FakeInner>>,
    scans: Arc<AtomicUsize>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Announce a unit on every scan. Adding the same mac twice makes scans
    /// report it twice.
    pub fn add_unit(&self, mac: &str, state: DeviceState) {
        let mut inner = self.inner.lock().unwrap();
        let host = inner.units.len() as u8 + 10;
        inner
            .units
            .push(DeviceInfo::new(mac, IpAddr::V4(Ipv4Addr::new(192, 168, 1, host))));
        inner.states.insert(mac.to_string(), state);
    }

    pub fn info(&self, mac: &str) -> DeviceInfo {
        let inner = self.inner.lock().unwrap();
        inner.units.iter().find(|u| u.mac == mac).cloned().unwrap()
    }

    pub fn set_state(&self, mac: &str, state: DeviceState) {
        self.inner.lock().unwrap().states.insert(mac.to_string(), state);
    }

    pub fn fail_bind(&self, mac: &str) {
        self.inner.lock().unwrap().bind_failures.insert(mac.to_string());
    }

    pub fn fail_refresh(&self, mac: &str) {
        self.inner.lock().unwrap().refresh_failures.insert(mac.to_string());
    }

    pub fn heal(&self, mac: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.bind_failures.remove(mac);
        inner.refresh_failures.remove(mac);
        inner.hanging.remove(mac);
    }

    /// Never answer bind or refresh for `mac`
    pub fn hang(&self, mac: &str) {
        self.inner.lock().unwrap().hanging.insert(mac.to_string());
    }

    pub fn fail_scans(&self) {
        self.inner.lock().unwrap().scan_fails = true;
    }

    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    pub fn bind_calls(&self, mac: &str) -> usize {
        self.inner.lock().unwrap().bind_calls.get(mac).copied().unwrap_or(0)
    }

    pub fn refresh_calls(&self, mac: &str) -> usize {
        self.inner.lock().unwrap().refresh_calls.get(mac).copied().unwrap_or(0)
    }

    pub fn total_refresh_calls(&self) -> usize {
        self.inner.lock().unwrap().refresh_calls.values().sum()
    }

    fn bind_reply(&self, mac: &str) -> Reply<()> {
        let mut inner = self.inner.lock().unwrap();
        *inner.bind_calls.entry(mac.to_string()).or_insert(0) += 1;
        if inner.hanging.contains(mac) {
            Reply::Hang
        } else if inner.bind_failures.contains(mac) {
            Reply::Ready(Err(DeviceError::NotBound { mac: mac.to_string() }))
        } else {
            Reply::Ready(Ok(()))
        }
    }

    fn refresh_reply(&self, mac: &str, wait_for: Duration) -> Reply<DeviceState> {
        let mut inner = self.inner.lock().unwrap();
        *inner.refresh_calls.entry(mac.to_string()).or_insert(0) += 1;
        if inner.hanging.contains(mac) {
            Reply::Hang
        } else if inner.refresh_failures.contains(mac) {
            Reply::Ready(Err(DeviceError::Timeout {
                mac: mac.to_string(),
                wait: wait_for,
            }))
        } else {
            Reply::Ready(Ok(inner.states.get(mac).cloned().unwrap_or_default()))
        }
    }
}

#[async_trait]
impl DeviceProtocol for FakeNetwork {
    async fn scan(&self, _wait_for: Duration) -> Result<Vec<DeviceInfo>, ScanError> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.lock().unwrap();
        if inner.scan_fails {
            return Err(ScanError("socket closed".to_string()));
        }
        Ok(inner.units.clone())
    }

    fn connect(&self, info: &DeviceInfo) -> Box<dyn DeviceClient> {
        Box::new(FakeClient {
            mac: info.mac.clone(),
            network: self.clone(),
        })
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

struct FakeClient {
    mac: String,
    network: FakeNetwork,
}

#[async_trait]
impl DeviceClient for FakeClient {
    async fn bind(&mut self) -> Result<(), DeviceError> {
        match self.network.bind_reply(&self.mac) {
            Reply::Ready(result) => result,
            Reply::Hang => std::future::pending().await,
        }
    }

    async fn update_state(&mut self, wait_for: Duration) -> Result<DeviceState, DeviceError> {
        match self.network.refresh_reply(&self.mac, wait_for) {
            Reply::Ready(result) => result,
            Reply::Hang => std::future::pending().await,
        }
    }
}
