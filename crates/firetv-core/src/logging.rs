//! Logging configuration using tracing

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Environment variable that overrides the log filter
pub const LOG_ENV_VAR: &str = "FIRETV_LOG";

/// Initialize the logging subsystem
///
/// Logs are written to `~/.local/share/firetv/logs/` so that command output
/// on stdout stays machine-readable. The level is controlled by the
/// `FIRETV_LOG` environment variable; `verbose` raises the default to debug.
///
/// # Examples
/// ```bash
/// FIRETV_LOG=debug firetv state living-room
/// FIRETV_LOG=firetv_adb=trace firetv apps living-room
/// ```
pub fn init(verbose: bool) -> Result<()> {
    let log_dir = get_log_directory()?;
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "firetv.log");

    let env_filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| default_filter(verbose));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .init();

    tracing::info!("═══════════════════════════════════════════════════════");
    tracing::info!("firetv starting");
    tracing::info!("Log directory: {}", log_dir.display());
    if verbose {
        tracing::info!("Verbose logging enabled");
    }
    tracing::info!("═══════════════════════════════════════════════════════");

    Ok(())
}

fn default_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("firetv=debug,firetv_core=debug,firetv_adb=debug,firetv_app=debug,warn")
    } else {
        EnvFilter::new("firetv=info,firetv_adb=info,firetv_app=info,warn")
    }
}

/// Get the log directory path
fn get_log_directory() -> Result<PathBuf> {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    Ok(base.join("firetv").join("logs"))
}
