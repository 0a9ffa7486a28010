//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [session]
//! ttl_secs = 3600
//! gc_interval_secs = 60
//! gc_enabled = true
//!
//! [logging]
//! level = "info"
//! json = false
//! file_dir = "/var/log/satchel"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use satchel_session::StoreConfig;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SatchelConfig {
    /// Session store configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionSection>,

    /// Logging configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingSection>,
}

impl SatchelConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: SatchelConfig = toml::from_str(toml_str)?;
        if let Some(ref session) = config.session {
            session.validate()?;
        }
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: SatchelConfig) {
        if other.session.is_some() {
            self.session = other.session;
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Session section, or its defaults.
    pub fn session_or_default(&self) -> SessionSection {
        self.session.clone().unwrap_or_default()
    }

    /// Logging section, or its defaults.
    pub fn logging_or_default(&self) -> LoggingSection {
        self.logging.clone().unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Session store configuration.
///
/// Sessions idle for longer than `ttl_secs` are reclaimed by the sweeper.
/// Without `gc_interval_secs` the sweeper runs once per TTL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Idle lifetime of a session in seconds.
    pub ttl_secs: u64,
    /// Seconds between sweeps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gc_interval_secs: Option<u64>,
    /// Whether the background sweeper runs.
    pub gc_enabled: bool,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            ttl_secs: satchel_session::DEFAULT_TTL.as_secs(),
            gc_interval_secs: None,
            gc_enabled: true,
        }
    }
}

impl SessionSection {
    fn validate(&self) -> Result<()> {
        if self.gc_interval_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "session.gc_interval_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.gc_enabled && self.gc_interval_secs.is_none() && self.ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.ttl_secs".to_string(),
                reason: "a zero TTL needs an explicit gc_interval_secs".to_string(),
            });
        }
        Ok(())
    }

    /// Build the store configuration this section describes.
    pub fn to_store_config(&self) -> StoreConfig {
        let mut config = StoreConfig::new()
            .with_ttl(Duration::from_secs(self.ttl_secs))
            .with_gc_task(self.gc_enabled);
        if let Some(secs) = self.gc_interval_secs {
            config = config.with_gc_interval(Duration::from_secs(secs));
        }
        config
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Console filter level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Emit console logs as JSON.
    pub json: bool,
    /// Directory for daily rolling JSON log files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_dir: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file_dir: None,
        }
    }
}
