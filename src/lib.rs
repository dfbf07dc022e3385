//! firetv - Control Amazon Fire TV devices over adb
//!
//! The binary is a thin wrapper: argument parsing lives in [`cli`], command
//! execution against the device registry in [`commands`].

pub mod cli;
pub mod commands;

pub use cli::{Cli, Command};
pub use commands::{execute, run};
