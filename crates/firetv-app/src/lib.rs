//! firetv-app - Configuration and device registry for firetv
//!
//! Loads the TOML configuration, validates the configured devices and keeps
//! one [`FireTv`](firetv_adb::FireTv) per device id behind a mutex so callers
//! can share the registry across tasks.

pub mod config;
pub mod registry;

pub use config::{load_settings, Settings};
pub use registry::{validate_app_id, validate_device_id, DeviceRegistry, DeviceSummary};
