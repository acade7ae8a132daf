//! DeviceRegistry: bound sessions keyed by mac
//!
//! Shared by the discovery loop (insert) and the refresh loop (snapshot).
//! There is no removal path; units that go offline stay registered.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::device::DeviceSession;
use crate::models::DeviceStatus;

#[derive(Clone, Default)]
pub struct DeviceRegistry {
    /// mac → bound session
    devices: Arc<RwLock<HashMap<String, Arc<DeviceSession>>>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, mac: &str) -> bool {
        self.devices.read().await.contains_key(mac)
    }

    /// Insert a freshly bound session. Returns `None` when the mac is
    /// already registered; the existing session is kept.
    pub async fn insert(&self, session: DeviceSession) -> Option<Arc<DeviceSession>> {
        let mut map = self.devices.write().await;
        match map.entry(session.mac().to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => Some(slot.insert(Arc::new(session)).clone()),
        }
    }

    pub async fn get(&self, mac: &str) -> Option<Arc<DeviceSession>> {
        self.devices.read().await.get(mac).cloned()
    }

    /// Current sessions; the lock is released before the caller does I/O
    pub async fn snapshot(&self) -> Vec<Arc<DeviceSession>> {
        self.devices.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.devices.read().await.is_empty()
    }

    /// Status of every session, sorted by mac
    pub async fn statuses(&self) -> Vec<DeviceStatus> {
        let mut statuses = Vec::new();
        for session in self.snapshot().await {
            statuses.push(session.status().await);
        }
        statuses.sort_by(|a, b| a.info.mac.cmp(&b.info.mac));
        statuses
    }
}
