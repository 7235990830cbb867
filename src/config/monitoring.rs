use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Metrics settings. The registry is process-wide; serving a scrape endpoint
/// is the host's concern, not the replica core's.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitoringConfig {
    #[serde(default = "default_prometheus_enabled")]
    pub prometheus_enabled: bool,

    #[serde(default = "default_prometheus_port")]
    pub prometheus_port: u16,
}

impl MonitoringConfig {
    pub fn validate(&self) -> Result<()> {
        if self.prometheus_enabled && self.prometheus_port == 0 {
            return Err(Error::Fatal(
                "prometheus_port cannot be 0 when prometheus is enabled".into(),
            ));
        }
        Ok(())
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            prometheus_enabled: default_prometheus_enabled(),
            prometheus_port: default_prometheus_port(),
        }
    }
}

fn default_prometheus_enabled() -> bool {
    true
}
fn default_prometheus_port() -> u16 {
    9100
}
