//! CLI command handlers.

pub mod config;
pub mod soak;

use std::path::PathBuf;

use satchel_config::LoadedConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Resolved configuration and where it came from.
    pub loaded: LoadedConfig,
    /// Merged configuration.
    pub config: satchel_config::SatchelConfig,
    /// User config directory given on the command line.
    pub config_dir: Option<PathBuf>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}
