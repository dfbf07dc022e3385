//! Configuration file parsing for firetv
//!
//! Settings live in `<config_dir>/firetv/config.toml` unless a path is given
//! on the command line.

pub mod settings;
pub mod types;

pub use settings::{default_config_path, load_settings, parse_settings};
pub use types::*;
