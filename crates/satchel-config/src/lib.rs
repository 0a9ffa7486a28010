//! Configuration system for satchel.
//!
//! Provides TOML-based configuration with:
//! - `[session]`: session lifetime and sweeper schedule
//! - `[logging]`: console filter, JSON output, rolling log files
//! - Config file layering (user config dir + project-local overrides)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, load_config_file, load_config_with_options, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::{LoggingSection, SatchelConfig, SessionSection};
