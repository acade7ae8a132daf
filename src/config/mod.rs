//! Configuration module

use std::time::Duration;

use serde::Deserialize;

use crate::device::simulated::SimulatedDevice;
use crate::error::ExporterError;

/// Prefix of the environment variables read at startup
pub const ENV_PREFIX: &str = "GREE_EXPORTER";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Seconds between network scans
    #[serde(default = "default_discovery_interval")]
    pub discovery_interval: u64,
    /// Seconds between state refreshes of bound devices
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,
    /// Per-operation wait budget in seconds
    #[serde(default = "default_wait_interval")]
    pub wait_interval: u64,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Units served by the simulated backend
    #[serde(default)]
    pub fleet: Vec<SimulatedDevice>,
}

/// Poll cadence derived from [`Config`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub discovery_interval: Duration,
    pub update_interval: Duration,
    pub wait_time: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            discovery_interval: default_discovery_interval(),
            update_interval: default_update_interval(),
            wait_interval: default_wait_interval(),
            namespace: default_namespace(),
            fleet: Vec::new(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    49209
}

fn default_discovery_interval() -> u64 {
    60
}

fn default_update_interval() -> u64 {
    30
}

fn default_wait_interval() -> u64 {
    5
}

fn default_namespace() -> String {
    "gree".to_string()
}

impl Config {
    /// Load `config/default` (optional) then `GREE_EXPORTER_*` variables
    pub fn load() -> Result<Self, ExporterError> {
        Self::build(
            Some("config/default"),
            config::Environment::with_prefix(ENV_PREFIX),
        )
    }

    fn build(file: Option<&str>, env: config::Environment) -> Result<Self, ExporterError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let settings = builder.add_source(env.try_parsing(true).ignore_empty(true)).build()?;
        let config: Config = settings.try_deserialize()?;

        Ok(config.with_fallbacks())
    }

    /// Zero counts as unset for every numeric setting
    fn with_fallbacks(mut self) -> Self {
        if self.port == 0 {
            self.port = default_port();
        }
        if self.discovery_interval == 0 {
            self.discovery_interval = default_discovery_interval();
        }
        if self.update_interval == 0 {
            self.update_interval = default_update_interval();
        }
        if self.wait_interval == 0 {
            self.wait_interval = default_wait_interval();
        }
        if self.namespace.trim().is_empty() {
            self.namespace = default_namespace();
        }
        self
    }

    pub fn timing(&self) -> Timing {
        Timing {
            discovery_interval: Duration::from_secs(self.discovery_interval),
            update_interval: Duration::from_secs(self.update_interval),
            wait_time: Duration::from_secs(self.wait_interval),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
