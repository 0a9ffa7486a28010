//! Session lifecycle on top of an injected provider.
//!
//! The manager decides when to resume and when to create, issues fresh
//! unguessable ids, and owns the GC schedule. Transport concerns (cookies,
//! request parsing) stay with the caller.

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::provider::SessionProvider;
use crate::session::Session;
use crate::sweeper::{GcHandle, GcTask};

/// Random bytes per generated session id.
const SESSION_ID_BYTES: usize = 32;

/// Attempts at finding an unused id before giving up.
const MAX_ID_ATTEMPTS: usize = 4;

/// Outcome of [`SessionManager::start`].
#[derive(Debug, Clone)]
pub struct StartedSession<S> {
    /// The live session.
    pub session: S,
    /// `true` when a new session was created instead of resuming one.
    pub created: bool,
}

/// Resumes or creates sessions and schedules their expiry.
pub struct SessionManager<P: SessionProvider> {
    provider: Arc<P>,
    config: StoreConfig,
}

impl<P: SessionProvider> Clone for SessionManager<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            config: self.config.clone(),
        }
    }
}

impl<P: SessionProvider> SessionManager<P> {
    pub fn new(provider: P, config: StoreConfig) -> Self {
        Self::from_arc(Arc::new(provider), config)
    }

    /// Build a manager around a provider that is shared elsewhere.
    pub fn from_arc(provider: Arc<P>, config: StoreConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Resume the session named by `existing`, or create a new one.
    ///
    /// An absent, empty or unknown id yields a fresh session under a newly
    /// generated id; the caller is expected to hand that id back to the
    /// client.
    pub fn start(&self, existing: Option<&str>) -> Result<StartedSession<P::Session>> {
        if let Some(id) = existing.filter(|id| !id.is_empty()) {
            match self.provider.read(id) {
                Ok(session) => {
                    return Ok(StartedSession {
                        session,
                        created: false,
                    });
                }
                Err(Error::NotFound(_)) => {
                    debug!(session_id = %id, "Unknown session id, issuing a new session");
                }
                Err(e) => return Err(e),
            }
        }

        let session = self.create_fresh()?;
        debug!(session_id = %session.id(), "New session started");
        Ok(StartedSession {
            session,
            created: true,
        })
    }

    /// Destroy a session. Missing ids are not an error.
    pub fn destroy(&self, id: &str) -> Result<()> {
        self.provider.destroy(id)
    }

    /// Run one sweep with the configured TTL.
    pub fn gc(&self) -> usize {
        self.provider.gc(self.config.ttl)
    }

    /// Spawn the periodic sweeper if the configuration enables it.
    pub fn spawn_gc(&self) -> Result<Option<GcHandle>> {
        if !self.config.enable_gc_task {
            debug!("GC task disabled");
            return Ok(None);
        }
        GcTask::spawn(
            Arc::clone(&self.provider),
            self.config.ttl,
            self.config.effective_gc_interval(),
        )
        .map(Some)
    }

    /// Generate an unguessable, URL-safe session id.
    pub fn generate_id() -> String {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    fn create_fresh(&self) -> Result<P::Session> {
        let mut last_id = String::new();
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = Self::generate_id();
            match self.provider.create(&id) {
                Ok(session) => return Ok(session),
                Err(Error::AlreadyExists(_)) => {
                    warn!(session_id = %id, "Generated session id collided, retrying");
                    last_id = id;
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::AlreadyExists(last_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use chrono::TimeDelta;
    use serde_json::json;
    use std::time::Duration;

    fn manager() -> SessionManager<MemoryStore> {
        SessionManager::new(MemoryStore::new(), StoreConfig::default())
    }

    #[test]
    fn test_generate_id_shape() {
        let id = SessionManager::<MemoryStore>::generate_id();
        // 32 bytes -> 43 base64 chars without padding
        assert_eq!(id.len(), 43);
        assert!(
            id.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        assert_ne!(id, SessionManager::<MemoryStore>::generate_id());
    }

    #[test]
    fn test_start_without_id_creates() {
        let manager = manager();
        let started = manager.start(None).unwrap();

        assert!(started.created);
        assert!(manager.provider().contains(started.session.id()));
    }

    #[test]
    fn test_start_with_empty_id_creates() {
        let manager = manager();
        let started = manager.start(Some("")).unwrap();
        assert!(started.created);
        assert!(!started.session.id().is_empty());
    }

    #[test]
    fn test_start_resumes_existing() {
        let manager = manager();
        let first = manager.start(None).unwrap();
        first.session.set("user", "bob").unwrap();

        let again = manager.start(Some(first.session.id())).unwrap();
        assert!(!again.created);
        assert_eq!(again.session.id(), first.session.id());
        assert_eq!(again.session.get("user"), Some(json!("bob")));
        assert_eq!(manager.provider().len(), 1);
    }

    #[test]
    fn test_start_with_unknown_id_issues_new() {
        let manager = manager();
        let started = manager.start(Some("forged-or-expired")).unwrap();

        assert!(started.created);
        assert_ne!(started.session.id(), "forged-or-expired");
        assert!(!manager.provider().contains("forged-or-expired"));
    }

    #[test]
    fn test_destroy() {
        let manager = manager();
        let started = manager.start(None).unwrap();
        let id = started.session.id().to_string();

        manager.destroy(&id).unwrap();
        manager.destroy(&id).unwrap();
        assert!(manager.provider().is_empty());
    }

    #[test]
    fn test_gc_uses_configured_ttl() {
        let clock = ManualClock::starting_now();
        let config = StoreConfig::new().with_ttl(Duration::from_secs(30));
        let manager = SessionManager::new(MemoryStore::with_clock(clock.clone()), config);

        let stale = manager.start(None).unwrap();
        clock.advance(TimeDelta::seconds(31));
        let live = manager.start(None).unwrap();

        assert_eq!(manager.gc(), 1);
        assert!(!stale.session.is_live());
        assert!(live.session.is_live());
    }

    #[tokio::test]
    async fn test_spawn_gc_respects_toggle() {
        let disabled = SessionManager::new(
            MemoryStore::new(),
            StoreConfig::new().with_gc_task(false),
        );
        assert!(disabled.spawn_gc().unwrap().is_none());

        let enabled = manager();
        let handle = enabled.spawn_gc().unwrap().expect("gc task enabled");
        assert!(handle.is_running());
        handle.stop().await;
    }
}
