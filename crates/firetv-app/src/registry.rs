//! Device registry - id to device mapping shared across callers
//!
//! Every device sits behind its own async mutex: one adb session must never
//! interleave commands, while different devices stay independent.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use tokio::sync::Mutex;

use firetv_adb::{Connector, DeviceOptions, FireTv};
use firetv_core::prelude::*;
use firetv_core::{DeviceState, Endpoint};

use crate::config::Settings;

/// Id given to the device passed with `--default`
pub const DEFAULT_DEVICE_ID: &str = "default";

static DEVICE_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-\w]+$").expect("Invalid device id regex"));

static APP_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-z.A-Z]+$").expect("Invalid app id regex"));

/// Device ids are word characters and dashes
pub fn validate_device_id(id: &str) -> Result<()> {
    if DEVICE_ID_REGEX.is_match(id) {
        Ok(())
    } else {
        Err(Error::InvalidDeviceId { id: id.to_string() })
    }
}

/// App ids are dotted package names made of letters only
pub fn validate_app_id(id: &str) -> Result<()> {
    if APP_ID_REGEX.is_match(id) {
        Ok(())
    } else {
        Err(Error::InvalidAppId { id: id.to_string() })
    }
}

/// A device handle shared between tasks
pub type SharedDevice<C> = Arc<Mutex<FireTv<C>>>;

/// One row of [`DeviceRegistry::list`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSummary {
    pub id: String,
    pub host: String,
    pub state: DeviceState,
}

/// Explicit map from device id to device
pub struct DeviceRegistry<C: Connector + Clone> {
    connector: C,
    options: DeviceOptions,
    devices: BTreeMap<String, SharedDevice<C>>,
}

impl<C: Connector + Clone> std::fmt::Debug for DeviceRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("devices", &self.devices.keys().collect::<Vec<_>>())
            .field("options", &self.options)
            .finish()
    }
}

impl<C: Connector + Clone> DeviceRegistry<C> {
    pub fn new(connector: C, options: DeviceOptions) -> Self {
        Self {
            connector,
            options,
            devices: BTreeMap::new(),
        }
    }

    /// Build a registry from validated settings plus an optional default host
    ///
    /// The default host, if any, is registered as [`DEFAULT_DEVICE_ID`].
    pub async fn from_settings(
        settings: &Settings,
        connector: C,
        default_host: Option<&Endpoint>,
    ) -> Result<Self> {
        settings.validate(default_host)?;

        let mut registry = Self::new(connector, settings.device.options());
        if let Some(host) = default_host {
            registry.insert(DEFAULT_DEVICE_ID, host.clone()).await?;
        }
        for (id, entry) in &settings.devices {
            let host = entry.host.parse()?;
            registry.insert(id, host).await?;
        }

        info!("Registered {} device(s)", registry.len());
        Ok(registry)
    }

    /// Validate and register a device, connecting to it right away
    ///
    /// Returns `false` when the id or host is malformed. An existing device
    /// with the same id is replaced.
    pub async fn add(&mut self, id: &str, host: &str) -> Result<bool> {
        if validate_device_id(id).is_err() {
            warn!("Rejected device id {:?}", id);
            return Ok(false);
        }
        let Ok(endpoint) = host.parse::<Endpoint>() else {
            warn!("Rejected host {:?} for device {:?}", host, id);
            return Ok(false);
        };

        self.insert(id, endpoint).await?;
        Ok(true)
    }

    async fn insert(&mut self, id: &str, endpoint: Endpoint) -> Result<()> {
        let device = match FireTv::new(
            endpoint.clone(),
            self.connector.clone(),
            self.options.clone(),
        )
        .await
        {
            Ok(device) => device,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Could not connect to {} ({}): {}", id, endpoint, e);
                FireTv::detached(endpoint, self.connector.clone(), self.options.clone())
            }
        };

        if self
            .devices
            .insert(id.to_string(), Arc::new(Mutex::new(device)))
            .is_some()
        {
            debug!("Replaced device {:?}", id);
        }
        Ok(())
    }

    /// Look up a device by id
    pub fn get(&self, id: &str) -> Result<SharedDevice<C>> {
        self.devices
            .get(id)
            .cloned()
            .ok_or_else(|| Error::unknown_device(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.devices.contains_key(id)
    }

    /// Device ids in sorted order
    pub fn ids(&self) -> Vec<String> {
        self.devices.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Id, host and freshly inferred state of every device
    pub async fn list(&self) -> Vec<DeviceSummary> {
        let mut summaries = Vec::with_capacity(self.devices.len());
        for (id, device) in &self.devices {
            let mut device = device.lock().await;
            summaries.push(DeviceSummary {
                id: id.clone(),
                host: device.endpoint().to_string(),
                state: device.state().await,
            });
        }
        summaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firetv_adb::test_utils::{Fault, MockConnector};

    fn registry(mock: &MockConnector) -> DeviceRegistry<MockConnector> {
        DeviceRegistry::new(mock.clone(), DeviceOptions::default())
    }

    #[test]
    fn test_validate_device_id() {
        assert!(validate_device_id("living-room").is_ok());
        assert!(validate_device_id("tv_2").is_ok());
        assert!(validate_device_id("").is_err());
        assert!(validate_device_id("living room").is_err());
        assert!(validate_device_id("../etc").is_err());
    }

    #[test]
    fn test_validate_app_id() {
        assert!(validate_app_id("com.netflix.ninja").is_ok());
        assert!(validate_app_id("com.amazon.avod").is_ok());
        assert!(matches!(
            validate_app_id("1com.app"),
            Err(Error::InvalidAppId { .. })
        ));
        assert!(validate_app_id("com.app; reboot").is_err());
        assert!(validate_app_id("c").is_err());
    }

    #[tokio::test]
    async fn test_add_valid_device() {
        let mock = MockConnector::new();
        let mut registry = registry(&mock);

        assert!(registry.add("living-room", "192.168.1.20:5555").await.unwrap());
        assert!(registry.contains("living-room"));
        assert_eq!(mock.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_add_rejects_malformed_input() {
        let mock = MockConnector::new();
        let mut registry = registry(&mock);

        assert!(!registry.add("living room", "192.168.1.20:5555").await.unwrap());
        assert!(!registry.add("tv", "192.168.1.20").await.unwrap());
        assert!(!registry.add("tv", "192.168.1.20:abc").await.unwrap());
        assert!(registry.is_empty());
        assert_eq!(mock.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_add_unreachable_device_is_kept() {
        let mock = MockConnector::new();
        mock.fail_next_connect(Fault::Refused);
        let mut registry = registry(&mock);

        assert!(registry.add("tv", "192.168.1.20:5555").await.unwrap());
        let device = registry.get("tv").unwrap();
        assert!(!device.lock().await.is_connected());
    }

    #[tokio::test]
    async fn test_add_non_fatal_connect_error_keeps_detached_device() {
        let mock = MockConnector::new();
        mock.fail_next_connect(Fault::Unavailable);
        let mut registry = registry(&mock);

        assert!(registry.add("tv", "192.168.1.20:5555").await.unwrap());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_add_multi_session_conflict_propagates() {
        let mock = MockConnector::new();
        mock.fail_next_connect(Fault::Handshake);
        let mut registry = registry(&mock);

        let err = registry.add("tv", "192.168.1.20:5555").await.unwrap_err();
        assert!(matches!(err, Error::MultiSessionConflict { .. }));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_get_unknown_device() {
        let mock = MockConnector::new();
        let registry = registry(&mock);

        let err = registry.get("nope").unwrap_err();
        assert!(matches!(err, Error::UnknownDevice { .. }));
    }

    #[tokio::test]
    async fn test_list_reports_fresh_state() {
        let mock = MockConnector::new();
        mock.with_device(true, true, "com.amazon.tv.launcher", 0);
        let mut registry = registry(&mock);
        registry.add("b-tv", "192.168.1.21:5555").await.unwrap();
        registry.add("a-tv", "192.168.1.20:5555").await.unwrap();

        let summaries = registry.list().await;
        assert_eq!(registry.ids(), vec!["a-tv", "b-tv"]);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, "a-tv");
        assert_eq!(summaries[0].host, "192.168.1.20:5555");
        assert_eq!(summaries[0].state, DeviceState::Standby);

        let json = serde_json::to_value(&summaries[1]).unwrap();
        assert_eq!(json["state"], "standby");
    }

    #[tokio::test]
    async fn test_from_settings_registers_default_and_configured() {
        let mock = MockConnector::new();
        let settings =
            crate::config::parse_settings("[devices.bedroom]\nhost = \"192.168.1.21:5555\"\n")
                .unwrap();
        let default_host: Endpoint = "192.168.1.20:5555".parse().unwrap();

        let registry = DeviceRegistry::from_settings(&settings, mock.clone(), Some(&default_host))
            .await
            .unwrap();
        assert_eq!(registry.ids(), vec!["bedroom", "default"]);
        assert_eq!(mock.connect_count(), 2);
    }

    #[tokio::test]
    async fn test_from_settings_rejects_default_host_reuse() {
        let mock = MockConnector::new();
        let settings =
            crate::config::parse_settings("[devices.tv]\nhost = \"192.168.1.20:5555\"\n").unwrap();
        let default_host: Endpoint = "192.168.1.20:5555".parse().unwrap();

        let err = DeviceRegistry::from_settings(&settings, mock.clone(), Some(&default_host))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
        assert_eq!(mock.connect_count(), 0);
    }
}
