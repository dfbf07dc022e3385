//! Command line arguments

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use firetv_core::Endpoint;

/// firetv - Control Amazon Fire TV devices over adb
#[derive(Parser, Debug)]
#[command(name = "firetv")]
#[command(about = "Control Amazon Fire TV devices over adb", long_about = None)]
pub struct Cli {
    /// Configuration file (default: <config dir>/firetv/config.toml)
    #[arg(short, long, value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Default Fire TV host (<address>:<port>), registered as device "default"
    #[arg(short = 'd', long = "default", value_name = "HOST")]
    pub default_host: Option<Endpoint>,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List devices with their current state
    List,

    /// Current state of a device
    State { device: String },

    /// Running user apps
    Apps { device: String },

    /// Whether an app is in the foreground
    AppState { device: String, app: String },

    /// Package and activity of the focused window
    CurrentApp { device: String },

    /// Run a named action (turn_on, home, volume_up, ...)
    Action { device: String, action: String },

    /// Launch an app
    Launch { device: String, app: String },

    /// Stop an app (returns to the home screen)
    Stop { device: String, app: String },

    /// Re-establish the adb connection
    Connect { device: String },

    /// Raw power facts from the power service
    Power { device: String },
}

impl Command {
    /// The device this command targets, if it targets exactly one
    pub fn device(&self) -> Option<&str> {
        match self {
            Command::List => None,
            Command::State { device }
            | Command::Apps { device }
            | Command::AppState { device, .. }
            | Command::CurrentApp { device }
            | Command::Action { device, .. }
            | Command::Launch { device, .. }
            | Command::Stop { device, .. }
            | Command::Connect { device }
            | Command::Power { device } => Some(device),
        }
    }
}
