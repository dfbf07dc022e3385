//! Application error types with rich context

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Transport/Connection Errors
    // ─────────────────────────────────────────────────────────────
    #[error("adb binary not found. Install Android platform-tools or set [adb] path.")]
    AdbNotFound,

    #[error("Device {host} has multiple adb connections; reboot the device and reconnect")]
    MultiSessionConflict { host: String },

    #[error("Transport to {host} was corrupted; the session was re-established, retry the request")]
    TransportCorruption { host: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Shell command timed out after {seconds}s: {command}")]
    Timeout { command: String, seconds: u64 },

    #[error("Device output could not be parsed: {message}")]
    Protocol { message: String },

    // ─────────────────────────────────────────────────────────────
    // Registry/Validation Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid endpoint '{value}': expected <address>:<port>")]
    InvalidEndpoint { value: String },

    #[error("Invalid device id '{id}'")]
    InvalidDeviceId { id: String },

    #[error("Invalid app id '{id}'")]
    InvalidAppId { id: String },

    #[error("Unknown device: {id}")]
    UnknownDevice { id: String },

    #[error("Unknown action: {name}")]
    UnknownAction { name: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn multi_session_conflict(host: impl Into<String>) -> Self {
        Self::MultiSessionConflict { host: host.into() }
    }

    pub fn transport_corruption(host: impl Into<String>) -> Self {
        Self::TransportCorruption { host: host.into() }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }

    pub fn invalid_endpoint(value: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            value: value.into(),
        }
    }

    pub fn unknown_device(id: impl Into<String>) -> Self {
        Self::UnknownDevice { id: id.into() }
    }

    /// Check if the failed request may simply be retried
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::TransportCorruption { .. }
                | Error::Transport { .. }
                | Error::Timeout { .. }
                | Error::Protocol { .. }
        )
    }

    /// Check if this error should abort the current command
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::AdbNotFound
                | Error::MultiSessionConflict { .. }
                | Error::ConfigNotFound { .. }
                | Error::ConfigInvalid { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
