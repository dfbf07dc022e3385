//! Core domain types for Fire TV control

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Package of the Amazon TV home screen
pub const LAUNCHER_PACKAGE: &str = "com.amazon.tv.launcher";

/// Intent category used to start an app from its launcher entry
pub const INTENT_LAUNCH: &str = "android.intent.category.LAUNCHER";

/// Intent category that brings up the home screen
pub const INTENT_HOME: &str = "android.intent.category.HOME";

// ─────────────────────────────────────────────────────────────────────────────
// Endpoint
// ─────────────────────────────────────────────────────────────────────────────

/// Network address of one device, `<address>:<port>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint {
    address: String,
    port: u16,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serial adb uses for a network device (`adb -s <serial>`)
    pub fn serial(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    /// Exactly one `:` separating a non-empty address from a numeric port.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let [address, port] = parts.as_slice() else {
            return Err(Error::invalid_endpoint(s));
        };

        if address.is_empty() || port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::invalid_endpoint(s));
        }

        let port = port.parse().map_err(|_| Error::invalid_endpoint(s))?;
        Ok(Self::new(*address, port))
    }
}

impl TryFrom<String> for Endpoint {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Device / App State
// ─────────────────────────────────────────────────────────────────────────────

/// Coarse state of a device, derived on every query and never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    /// No live adb session
    Disconnected,
    /// Screen is powered off
    Off,
    /// Screen on but the screensaver is running
    Idle,
    /// Home screen is in the foreground
    Standby,
    /// Something holds a wake lock
    Playing,
    /// An app is in the foreground and nothing holds a wake lock
    Paused,
}

impl DeviceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceState::Disconnected => "disconnected",
            DeviceState::Off => "off",
            DeviceState::Idle => "idle",
            DeviceState::Standby => "standby",
            DeviceState::Playing => "playing",
            DeviceState::Paused => "paused",
        }
    }

    /// Whether the screen is considered powered
    pub fn is_on(&self) -> bool {
        !matches!(self, DeviceState::Disconnected | DeviceState::Off)
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Foreground state of a single app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    On,
    Off,
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppState::On => write!(f, "on"),
            AppState::Off => write!(f, "off"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsed Facts
// ─────────────────────────────────────────────────────────────────────────────

/// The focused window as reported by `dumpsys window windows`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusedWindow {
    /// Owning package, e.g. `com.netflix.ninja`
    pub package: String,
    /// Activity class, when the window line carries one
    pub activity: Option<String>,
}

impl FocusedWindow {
    pub fn new(package: impl Into<String>, activity: Option<String>) -> Self {
        Self {
            package: package.into(),
            activity,
        }
    }

    pub fn is_launcher(&self, launcher_package: &str) -> bool {
        self.package == launcher_package
    }
}

/// Facts read from `dumpsys power`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PowerFacts {
    /// `Display Power: state=ON`
    pub screen_on: bool,
    /// `mWakefulness=Awake`
    pub awake: bool,
    /// Value of `size=N` on the `Locks` line
    pub wake_lock_count: u32,
}

/// Outcome of an intent sent through `monkey ...; echo $?`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentResult {
    /// Exit status echoed by the remote shell
    pub return_code: i32,
    /// Everything `monkey` printed before the status line
    pub output: String,
}

impl IntentResult {
    pub fn success(&self) -> bool {
        self.return_code == 0
    }
}
