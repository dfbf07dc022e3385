//! Settings parser for config.toml

use std::path::{Path, PathBuf};

use firetv_core::prelude::*;
use firetv_core::Endpoint;

use super::types::Settings;
use crate::registry::{validate_device_id, DEFAULT_DEVICE_ID};

const CONFIG_FILENAME: &str = "config.toml";
const APP_DIR: &str = "firetv";

/// `<config_dir>/firetv/config.toml`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILENAME))
}

/// Load settings from `path`, or from the default location
///
/// A missing file at the default location yields defaults; an explicitly
/// requested file must exist.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let config_path = match path {
        Some(path) => {
            if !path.exists() {
                return Err(Error::ConfigNotFound {
                    path: path.to_path_buf(),
                });
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            Some(path) => {
                debug!("No config file at {:?}, using defaults", path);
                return Ok(Settings::default());
            }
            None => {
                debug!("No config directory on this platform, using defaults");
                return Ok(Settings::default());
            }
        },
    };

    let content = std::fs::read_to_string(&config_path)
        .map_err(|e| Error::config(format!("Failed to read {:?}: {}", config_path, e)))?;
    let settings = parse_settings(&content).map_err(|e| match e {
        Error::ConfigInvalid { message } => {
            Error::config_invalid(format!("{}: {}", config_path.display(), message))
        }
        other => other,
    })?;

    debug!("Loaded settings from {:?}", config_path);
    Ok(settings)
}

/// Parse and validate the contents of a config file
pub fn parse_settings(content: &str) -> Result<Settings> {
    let settings: Settings =
        toml::from_str(content).map_err(|e| Error::config_invalid(e.to_string()))?;
    settings.validate(None)?;
    Ok(settings)
}

impl Settings {
    /// Check device ids, hosts and their interplay with a `--default` host
    ///
    /// With a default host, a device named `default` or one pointing at the
    /// same host would shadow it.
    pub fn validate(&self, default_host: Option<&Endpoint>) -> Result<()> {
        if self.adb.command_timeout_secs == 0 {
            return Err(Error::config_invalid("adb.command_timeout_secs must be > 0"));
        }

        for (id, entry) in &self.devices {
            validate_device_id(id)
                .map_err(|_| Error::config_invalid(format!("invalid device id {:?}", id)))?;

            let host: Endpoint = entry.host.parse().map_err(|_| {
                Error::config_invalid(format!(
                    "device {:?} has invalid host {:?}, expected <address>:<port>",
                    id, entry.host
                ))
            })?;

            if let Some(default_host) = default_host {
                if id == DEFAULT_DEVICE_ID {
                    return Err(Error::config_invalid(format!(
                        "device id {:?} is reserved when a default host is given",
                        DEFAULT_DEVICE_ID
                    )));
                }
                if &host == default_host {
                    return Err(Error::config_invalid(format!(
                        "device {:?} uses the default host {}",
                        id, default_host
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_parse_full_config() {
        let content = r#"
[adb]
path = "/opt/platform-tools/adb"
command_timeout_secs = 5

[device]
launcher_package = "com.amazon.tv.launcher"
process_filter = "u0_a"

[devices.living-room]
host = "192.168.1.20:5555"

[devices.bedroom]
host = "192.168.1.21:5555"
"#;
        let settings = parse_settings(content).unwrap();

        assert_eq!(
            settings.adb.path,
            PathBuf::from("/opt/platform-tools/adb")
        );
        assert_eq!(settings.adb.command_timeout(), Duration::from_secs(5));
        assert_eq!(settings.devices.len(), 2);
        assert_eq!(settings.devices["living-room"].host, "192.168.1.20:5555");
        let ids: Vec<_> = settings.devices.keys().cloned().collect();
        assert_eq!(ids, vec!["bedroom", "living-room"]);
    }

    #[test]
    fn test_parse_empty_is_default() {
        let settings = parse_settings("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.adb.path, PathBuf::from("adb"));
        assert_eq!(settings.device.options().process_filter, "u0_a");
    }

    #[test]
    fn test_parse_partial_sections_fill_defaults() {
        let settings = parse_settings("[device]\nprocess_filter = \"u0_\"\n").unwrap();
        assert_eq!(settings.device.process_filter, "u0_");
        assert_eq!(settings.device.launcher_package, "com.amazon.tv.launcher");
        assert_eq!(settings.adb.command_timeout_secs, 10);
    }

    #[test]
    fn test_parse_rejects_bad_toml() {
        let err = parse_settings("[adb\npath = ").unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_host() {
        let err = parse_settings("[devices.tv]\nhost = \"192.168.1.20\"\n").unwrap_err();
        assert!(err.to_string().contains("invalid host"));

        let err = parse_settings("[devices.tv]\nhost = \"tv:port\"\n").unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_device_id() {
        let err = parse_settings("[devices.\"living room\"]\nhost = \"tv:5555\"\n").unwrap_err();
        assert!(err.to_string().contains("invalid device id"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        assert!(parse_settings("[adb]\ncommand_timeout_secs = 0\n").is_err());
    }

    #[test]
    fn test_validate_default_host_conflicts() {
        let default_host: Endpoint = "192.168.1.20:5555".parse().unwrap();

        let settings = parse_settings("[devices.default]\nhost = \"192.168.1.30:5555\"\n").unwrap();
        assert!(settings.validate(None).is_ok());
        assert!(settings.validate(Some(&default_host)).is_err());

        let settings = parse_settings("[devices.tv]\nhost = \"192.168.1.20:5555\"\n").unwrap();
        let err = settings.validate(Some(&default_host)).unwrap_err();
        assert!(err.to_string().contains("default host"));

        let settings = parse_settings("[devices.tv]\nhost = \"192.168.1.21:5555\"\n").unwrap();
        assert!(settings.validate(Some(&default_host)).is_ok());
    }

    #[test]
    fn test_load_settings_explicit_missing_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let err = load_settings(Some(&path)).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_load_settings_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[devices.tv]\nhost = \"10.0.0.5:5555\"\n").unwrap();

        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.devices["tv"].host, "10.0.0.5:5555");
    }

    #[test]
    fn test_load_settings_invalid_file_names_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "devices = 3\n").unwrap();

        let err = load_settings(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_default_config_path_shape() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("firetv/config.toml"));
        }
    }
}
