//! Configuration types for firetv

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use firetv_adb::{DeviceOptions, DEFAULT_PROCESS_FILTER};
use firetv_core::LAUNCHER_PACKAGE;

/// Whole configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub adb: AdbSettings,
    pub device: DeviceSettings,

    /// Named devices, keyed by device id
    pub devices: BTreeMap<String, DeviceEntry>,
}

/// `[adb]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdbSettings {
    /// adb binary; a bare name is looked up on `PATH`
    pub path: PathBuf,

    /// Upper bound for a single adb invocation
    pub command_timeout_secs: u64,
}

impl Default for AdbSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("adb"),
            command_timeout_secs: 10,
        }
    }
}

impl AdbSettings {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

/// `[device]` section, shared by every configured device
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceSettings {
    pub launcher_package: String,
    pub process_filter: String,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            launcher_package: LAUNCHER_PACKAGE.to_string(),
            process_filter: DEFAULT_PROCESS_FILTER.to_string(),
        }
    }
}

impl DeviceSettings {
    pub fn options(&self) -> DeviceOptions {
        DeviceOptions {
            launcher_package: self.launcher_package.clone(),
            process_filter: self.process_filter.clone(),
        }
    }
}

/// One `[devices.<id>]` table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeviceEntry {
    /// `<address>:<port>`
    pub host: String,
}
