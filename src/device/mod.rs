//! Device layer
//!
//! - `DeviceProtocol` / `DeviceClient`: seams to the air-conditioner protocol
//! - `session`: one bound unit with bounded-time bind and refresh
//! - `simulated`: config-driven fleet used when no protocol client is linked

pub mod session;
pub mod simulated;

#[cfg(test)]
pub(crate) mod fake;

pub use session::DeviceSession;
pub use simulated::SimulatedFleet;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{DeviceError, ScanError};
use crate::models::{DeviceInfo, DeviceState};

/// Network-level access to units: scanning and opening clients
#[async_trait]
pub trait DeviceProtocol: Send + Sync {
    /// Listen for units for up to `wait_for`; may return duplicates
    async fn scan(&self, wait_for: Duration) -> Result<Vec<DeviceInfo>, ScanError>;

    /// Open an unbound client for a discovered unit
    fn connect(&self, info: &DeviceInfo) -> Box<dyn DeviceClient>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

/// Connection to a single unit
#[async_trait]
pub trait DeviceClient: Send {
    /// Handshake and key exchange
    async fn bind(&mut self) -> Result<(), DeviceError>;

    /// Fetch current operating properties
    async fn update_state(&mut self, wait_for: Duration) -> Result<DeviceState, DeviceError>;
}
