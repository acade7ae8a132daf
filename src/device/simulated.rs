//! Simulated fleet backend
//!
//! Serves units declared under `fleet` in the config file. Lets the exporter
//! run end to end (scan, bind, refresh, scrape) without a protocol client.
//!
//! ```toml
//! [[fleet]]
//! mac = "AA:BB:CC:DD:EE:FF"
//! ip = "192.168.1.40"
//! name = "living-room"
//! properties = { power = true, mode = 1, target_temperature = 24 }
//! ```

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::device::{DeviceClient, DeviceProtocol};
use crate::error::{DeviceError, ScanError};
use crate::models::{DeviceInfo, DeviceState};

#[derive(Debug, Clone, Deserialize)]
pub struct SimulatedDevice {
    #[serde(flatten)]
    pub info: DeviceInfo,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
    /// Unit answers scans but rejects binding
    #[serde(default)]
    pub locked: bool,
}

pub struct SimulatedFleet {
    devices: Vec<SimulatedDevice>,
}

impl SimulatedFleet {
    pub fn new(devices: Vec<SimulatedDevice>) -> Self {
        Self { devices }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[async_trait]
impl DeviceProtocol for SimulatedFleet {
    async fn scan(&self, _wait_for: Duration) -> Result<Vec<DeviceInfo>, ScanError> {
        Ok(self.devices.iter().map(|d| d.info.clone()).collect())
    }

    fn connect(&self, info: &DeviceInfo) -> Box<dyn DeviceClient> {
        let device = self.devices.iter().find(|d| d.info.mac == info.mac);
        Box::new(SimulatedUnit {
            mac: info.mac.clone(),
            properties: device.map(|d| d.properties.clone()).unwrap_or_default(),
            locked: device.map_or(true, |d| d.locked),
            bound: false,
        })
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

struct SimulatedUnit {
    mac: String,
    properties: HashMap<String, Value>,
    locked: bool,
    bound: bool,
}

#[async_trait]
impl DeviceClient for SimulatedUnit {
    async fn bind(&mut self) -> Result<(), DeviceError> {
        if self.locked {
            return Err(DeviceError::NotBound {
                mac: self.mac.clone(),
            });
        }
        self.bound = true;
        Ok(())
    }

    async fn update_state(&mut self, _wait_for: Duration) -> Result<DeviceState, DeviceError> {
        if !self.bound {
            return Err(DeviceError::NotBound {
                mac: self.mac.clone(),
            });
        }
        Ok(self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
