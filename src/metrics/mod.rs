//! Metric registry adapter
//!
//! One `GaugeVec` per entry of [`PROPERTIES`], named `<namespace>_<property>`
//! and labeled by device mac. Built once at startup.

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

use crate::models::{DeviceState, PROPERTIES};

pub const MAC_LABEL: &str = "mac";

struct PropertyGauge {
    property: &'static str,
    gauge: GaugeVec,
}

pub struct GaugeSet {
    namespace: String,
    registry: Registry,
    gauges: Vec<PropertyGauge>,
}

impl GaugeSet {
    pub fn new(namespace: &str) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let gauges = PROPERTIES
            .iter()
            .map(|&property| {
                let name = format!("{}_{}", namespace, property);
                let help = format!("Last reported {} of the unit", property.replace('_', " "));
                let gauge = GaugeVec::new(Opts::new(name, help), &[MAC_LABEL])?;
                registry.register(Box::new(gauge.clone()))?;
                Ok(PropertyGauge { property, gauge })
            })
            .collect::<Result<Vec<_>, prometheus::Error>>()?;

        Ok(Self {
            namespace: namespace.to_string(),
            registry,
            gauges,
        })
    }

    /// Write every numeric property of `state` under `mac`.
    ///
    /// Missing and non-numeric properties are skipped and leave their gauge
    /// untouched. Returns the number of gauges written.
    pub fn record(&self, mac: &str, state: &DeviceState) -> usize {
        let mut written = 0;
        for binding in &self.gauges {
            if let Some(value) = state.gauge_value(binding.property) {
                binding.gauge.with_label_values(&[mac]).set(value);
                written += 1;
            }
        }
        written
    }

    /// Current sample for `property` under `mac`, if one was ever set
    pub fn value(&self, property: &str, mac: &str) -> Option<f64> {
        let name = format!("{}_{}", self.namespace, property);
        let families = self.registry.gather();
        let value = families
            .iter()
            .filter(|family| family.get_name() == name)
            .flat_map(|family| family.get_metric().iter())
            .find(|metric| {
                metric
                    .get_label()
                    .iter()
                    .any(|label| label.get_name() == MAC_LABEL && label.get_value() == mac)
            })
            .map(|metric| metric.get_gauge().get_value());
        value
    }

    /// Registry contents in the text exposition format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}
