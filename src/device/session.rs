//! DeviceSession: one bound unit
//!
//! Every network call runs under an outer timeout equal to the wait budget,
//! so a hung client cannot stall a poll cycle.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;

use crate::device::DeviceClient;
use crate::error::DeviceError;
use crate::models::{DeviceInfo, DeviceState, DeviceStatus};

struct SessionData {
    state: DeviceState,
    last_refresh: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

pub struct DeviceSession {
    info: DeviceInfo,
    client: Mutex<Box<dyn DeviceClient>>,
    bound_at: DateTime<Utc>,
    data: RwLock<SessionData>,
}

impl DeviceSession {
    /// Bind `client` to the unit. A session only exists after a complete bind.
    pub async fn bind(
        info: DeviceInfo,
        mut client: Box<dyn DeviceClient>,
        wait_for: Duration,
    ) -> Result<Self, DeviceError> {
        match timeout(wait_for, client.bind()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(DeviceError::Timeout {
                    mac: info.mac.clone(),
                    wait: wait_for,
                })
            }
        }

        Ok(Self {
            info,
            client: Mutex::new(client),
            bound_at: Utc::now(),
            data: RwLock::new(SessionData {
                state: DeviceState::default(),
                last_refresh: None,
                last_error: None,
            }),
        })
    }

    pub fn mac(&self) -> &str {
        &self.info.mac
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Pull current state. On failure the previous state is kept.
    pub async fn refresh(&self, wait_for: Duration) -> Result<DeviceState, DeviceError> {
        let result = timeout(wait_for, async {
            let mut client = self.client.lock().await;
            client.update_state(wait_for).await
        })
        .await
        .unwrap_or_else(|_| {
            Err(DeviceError::Timeout {
                mac: self.info.mac.clone(),
                wait: wait_for,
            })
        });

        let mut data = self.data.write().await;
        match &result {
            Ok(state) => {
                data.state = state.clone();
                data.last_refresh = Some(Utc::now());
                data.last_error = None;
            }
            Err(e) => data.last_error = Some(e.to_string()),
        }

        result
    }

    pub async fn status(&self) -> DeviceStatus {
        let data = self.data.read().await;
        DeviceStatus {
            info: self.info.clone(),
            bound_at: self.bound_at,
            last_refresh: data.last_refresh,
            last_error: data.last_error.clone(),
            state: data.state.clone(),
        }
    }
}
