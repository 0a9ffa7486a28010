//! Provider abstraction over session stores.
//!
//! Callers construct a concrete provider and hand it to a
//! [`SessionManager`](crate::SessionManager); there is no global registry.

use std::time::Duration;

use crate::error::Result;
use crate::session::{Session, SessionHandle};
use crate::store::MemoryStore;

/// Backend that owns live sessions and reclaims expired ones.
pub trait SessionProvider: Send + Sync + 'static {
    /// Handle type returned for a live session.
    type Session: Session + Clone + Send + Sync + 'static;

    /// Create a session with empty attributes.
    fn create(&self, id: &str) -> Result<Self::Session>;

    /// Look up a live session. Fails with `NotFound` on a miss and never
    /// creates one.
    fn read(&self, id: &str) -> Result<Self::Session>;

    /// Remove a session. Missing ids are not an error.
    fn destroy(&self, id: &str) -> Result<()>;

    /// Remove sessions idle for longer than `ttl`, returning how many.
    fn gc(&self, ttl: Duration) -> usize;
}

impl SessionProvider for MemoryStore {
    type Session = SessionHandle;

    fn create(&self, id: &str) -> Result<SessionHandle> {
        MemoryStore::create(self, id)
    }

    fn read(&self, id: &str) -> Result<SessionHandle> {
        MemoryStore::read(self, id)
    }

    fn destroy(&self, id: &str) -> Result<()> {
        MemoryStore::destroy(self, id)
    }

    fn gc(&self, ttl: Duration) -> usize {
        MemoryStore::gc(self, ttl)
    }
}
