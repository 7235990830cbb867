//! Configuration management for the replica core.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Environment variable overrides
//! - Configuration file support
//! - Component-wise validation
mod monitoring;
mod replication;
mod throttling;

pub use monitoring::*;
pub use replication::*;
pub use throttling::*;


//---
use std::env;
use std::fmt::Debug;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Main configuration container for the replica host process.
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct ReplicaNodeConfig {
    /// Mutation pipeline and checkpoint parameters
    pub replication: ReplicationConfig,
    /// Read/write admission throttling
    pub throttling: ThrottlingConfig,
    /// Metrics and monitoring settings
    pub monitoring: MonitoringConfig,
}

impl Debug for ReplicaNodeConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ReplicaNodeConfig")
            .field("replication", &self.replication)
            .finish()
    }
}

impl ReplicaNodeConfig {
    /// Creates a new configuration with hierarchical override support.
    ///
    /// Configuration sources are merged in the following order (later
    /// sources override earlier ones):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable
    /// 3. Environment variables with `REPLICA__` prefix (highest priority)
    pub fn new() -> Result<Self> {
        // 1. Default values as the base layer
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        // 2. Conditionally add configuration files
        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path));
        }

        // 3. Add environment variable source
        builder = builder.add_source(
            Environment::with_prefix("REPLICA")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validates all subsystem configurations
    pub fn validate(&self) -> Result<()> {
        self.replication.validate()?;
        self.throttling.validate()?;
        self.monitoring.validate()?;
        Ok(())
    }
}
