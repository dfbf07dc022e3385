//! # firetv-core - Core Domain Types
//!
//! Foundation crate for firetv. Provides the device state model, key codes,
//! error handling, logging setup and the parsers for the diagnostic text a
//! Fire TV returns over `adb shell`.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, regex, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`DeviceState`] - Coarse power/playback state inferred from dumps
//! - [`AppState`] - Whether a named app is in the foreground
//! - [`FocusedWindow`] - Package and activity of the focused window
//! - [`PowerFacts`] - Facts read from the power service dump
//! - [`IntentResult`] - Return code and output of an intent broadcast
//!
//! ### Actions (`keys`)
//! - [`KeyAction`] - Named remote keys mapped to Android key codes
//! - [`Action`] - Closed set of actions that may be invoked by name
//!
//! ### Parsing (`parse`)
//! - [`parse_focused_window()`] - Read the focused window out of a window dump
//! - [`dump_contains()`] - Substring probe over a (possibly empty) dump
//! - [`parse_intent_output()`] - Split `monkey ...; echo $?` output
//! - [`LineSplitter`] - Reassemble lines from fragmented streaming output
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! ```rust
//! use firetv_core::prelude::*;
//! ```

pub mod error;
pub mod keys;
pub mod logging;
pub mod parse;
pub mod types;

/// Prelude for common imports used throughout all firetv crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, trace, warn};
}

pub use error::{Error, Result, ResultExt};
pub use keys::{Action, KeyAction};
pub use parse::{
    dump_contains, parse_focused_window, parse_intent_output, parse_lock_count,
    parse_power_facts, process_name, LineSplitter,
};
pub use types::{
    AppState, DeviceState, Endpoint, FocusedWindow, IntentResult, PowerFacts, LAUNCHER_PACKAGE,
};
