//! # firetv-adb - Device Control over adb
//!
//! Talks to a Fire TV through the `adb` host binary, keeps one session per
//! device alive and turns shell output into [`DeviceState`] values.
//!
//! Depends on [`firetv_core`] for domain types, parsing and error handling.
//!
//! ## Public API
//!
//! ### Transport
//! - [`Transport`] - Executes shell commands (buffered or streaming) on one device
//! - [`Connector`] - Opens a [`Transport`] session to an [`Endpoint`]
//! - [`TransportError`] - Transport failures, including refused and corrupted links
//! - [`AdbConnector`], [`AdbSession`] - Implementation backed by the `adb` binary
//!
//! ### Connection Management
//! - [`Connection`] - Owns the session lifetime and reconnects after corruption
//! - [`ConnectOutcome`] - `Connected` or `Unreachable` (refused, not an error)
//!
//! ### Device Control
//! - [`FireTv`] - State inference and command dispatch for one device
//! - [`DeviceOptions`] - Launcher package and process filter
//!
//! [`DeviceState`]: firetv_core::DeviceState
//! [`Endpoint`]: firetv_core::Endpoint

pub mod adb;
pub mod connection;
pub mod device;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;
pub mod transport;

pub use adb::{AdbConnector, AdbSession};
pub use connection::{ConnectOutcome, Connection};
pub use device::{DeviceOptions, FireTv, DEFAULT_PROCESS_FILTER};
pub use transport::{Connector, LocalTransport, ShellStream, Transport, TransportError};
