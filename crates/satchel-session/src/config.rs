//! Configuration for the session store and its sweeper.

use std::time::Duration;

/// Default session lifetime: one hour of inactivity.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Configuration for expiry and periodic garbage collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Sessions idle for longer than this are reclaimed by GC.
    pub ttl: Duration,

    /// Interval between sweeps. `None` sweeps once per `ttl`.
    pub gc_interval: Option<Duration>,

    /// Whether a background sweeper should be spawned.
    pub enable_gc_task: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            gc_interval: None,
            enable_gc_task: true,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session time-to-live.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set an explicit sweep interval.
    pub fn with_gc_interval(mut self, interval: Duration) -> Self {
        self.gc_interval = Some(interval);
        self
    }

    /// Enable or disable the background sweeper.
    pub fn with_gc_task(mut self, enabled: bool) -> Self {
        self.enable_gc_task = enabled;
        self
    }

    /// The interval the sweeper actually runs at.
    pub fn effective_gc_interval(&self) -> Duration {
        self.gc_interval.unwrap_or(self.ttl)
    }
}
