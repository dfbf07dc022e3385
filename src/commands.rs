//! Command execution
//!
//! Each command produces one JSON object: `{"state": ...}`,
//! `{"running_apps": [...]}`, `{"success": ...}` and so on.

use serde_json::{json, Value};

use firetv_adb::{AdbConnector, ConnectOutcome, Connector};
use firetv_app::config::load_settings;
use firetv_app::registry::DEFAULT_DEVICE_ID;
use firetv_app::{validate_app_id, DeviceRegistry};
use firetv_core::prelude::*;
use firetv_core::{Action, IntentResult};

use crate::cli::{Cli, Command};

/// Load configuration, connect the devices the command needs and run it
pub async fn run(cli: Cli) -> Result<()> {
    let mut settings = load_settings(cli.config.as_deref())?;
    let mut default_host = cli.default_host.clone();
    settings.validate(default_host.as_ref())?;

    // Only connect to the device a single-device command addresses
    if let Some(device) = cli.command.device() {
        settings.devices.retain(|id, _| id == device);
        if device != DEFAULT_DEVICE_ID {
            default_host = None;
        }
    }

    let connector = AdbConnector::locate(&settings.adb.path, settings.adb.command_timeout())?;
    let registry =
        DeviceRegistry::from_settings(&settings, connector, default_host.as_ref()).await?;

    let output = execute(&registry, &cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Run one command against the registry
pub async fn execute<C: Connector + Clone>(
    registry: &DeviceRegistry<C>,
    command: &Command,
) -> Result<Value> {
    debug!("Executing {:?}", command);

    if let Command::List = command {
        return Ok(json!({ "devices": registry.list().await }));
    }

    // Reject bad input before touching the device
    let action = match command {
        Command::Action { action, .. } => Some(action.parse::<Action>()?),
        _ => None,
    };
    if let Command::AppState { app, .. } | Command::Launch { app, .. } | Command::Stop { app, .. } =
        command
    {
        validate_app_id(app)?;
    }

    let Some(id) = command.device() else {
        return Ok(Value::Null);
    };
    let device = registry.get(id)?;
    let mut device = device.lock().await;

    let output = match command {
        Command::List => Value::Null,
        Command::State { .. } => json!({ "state": device.state().await }),
        Command::Apps { .. } => json!({ "running_apps": device.running_apps().await? }),
        Command::AppState { app, .. } => json!({ "state": device.app_state(app).await }),
        Command::CurrentApp { .. } => json!({ "current_app": device.current_app().await? }),
        Command::Action { .. } => {
            if let Some(action) = action {
                device.perform(action).await?;
            }
            json!({ "success": true })
        }
        Command::Launch { app, .. } => intent_reply(device.launch_app(app).await?),
        Command::Stop { app, .. } => intent_reply(device.stop_app(app).await?),
        Command::Connect { .. } => {
            let outcome = device.connect().await?;
            json!({ "success": outcome == ConnectOutcome::Connected })
        }
        Command::Power { .. } => json!({ "power": device.power_facts().await? }),
    };

    Ok(output)
}

fn intent_reply(result: Option<IntentResult>) -> Value {
    match result {
        Some(result) => json!({
            "success": result.success(),
            "return_code": result.return_code,
            "output": result.output,
        }),
        None => json!({ "success": false }),
    }
}
