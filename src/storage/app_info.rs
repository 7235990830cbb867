//! Immutable table metadata and its on-disk form.
//!
//! Each replica directory carries an `.app-info` file so a replica can be
//! reopened after a process restart without asking the meta service first.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::APP_INFO_FILE;
use crate::Result;
use crate::StorageError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AppInfo {
    pub app_id: i32,
    pub app_name: String,
    pub app_type: String,
    pub partition_count: i32,
    pub max_replica_count: i32,
    pub envs: HashMap<String, String>,
    pub duplicating: bool,
}

/// Persist `app_info` under the replica directory.
pub fn save_app_info(
    dir: &Path,
    app_info: &AppInfo,
) -> Result<()> {
    let path = dir.join(APP_INFO_FILE);
    let bytes = bincode::serialize(app_info).map_err(StorageError::BincodeError)?;
    fs::write(&path, bytes).map_err(|e| StorageError::PathError { path, source: e })?;
    Ok(())
}

/// Load the `.app-info` file from a replica directory.
pub fn load_app_info(dir: &Path) -> Result<AppInfo> {
    let path = dir.join(APP_INFO_FILE);
    let bytes = fs::read(&path).map_err(|e| StorageError::PathError { path, source: e })?;
    let app_info = bincode::deserialize(&bytes).map_err(StorageError::BincodeError)?;
    Ok(app_info)
}
