use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Read/write admission throttling. The two directions are independent.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ThrottlingConfig {
    #[serde(default)]
    pub read: ThrottleOptions,

    #[serde(default)]
    pub write: ThrottleOptions,
}

impl ThrottlingConfig {
    pub fn validate(&self) -> Result<()> {
        self.read.validate()?;
        self.write.validate()?;
        Ok(())
    }
}

/// One direction of admission throttling.
///
/// Requests beyond half the QPS limit are delayed; requests beyond the limit
/// itself are rejected with a busy verdict.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ThrottleOptions {
    #[serde(default)]
    pub enabled: bool,

    /// Requests per second admitted before throttling verdicts kick in.
    #[serde(default = "default_qps_limit")]
    pub qps_limit: u64,

    /// Delay applied to requests in the delay band.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl ThrottleOptions {
    fn validate(&self) -> Result<()> {
        if self.enabled && self.qps_limit == 0 {
            return Err(Error::Fatal(
                "throttling qps_limit cannot be 0 when enabled".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ThrottleOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            qps_limit: default_qps_limit(),
            delay_ms: default_delay_ms(),
        }
    }
}

fn default_qps_limit() -> u64 {
    20000
}
fn default_delay_ms() -> u64 {
    100
}
