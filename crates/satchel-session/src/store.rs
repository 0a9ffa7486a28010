//! In-memory session store with recency-ordered expiry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::recency::{NodeId, RecencyList};
use crate::session::SessionHandle;

/// A single session's state, owned by the store.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    id: String,
    created_at: DateTime<Utc>,
    last_accessed: DateTime<Utc>,
    attributes: HashMap<String, Value>,
}

impl SessionEntry {
    fn new(id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at: now,
            last_accessed: now,
            attributes: HashMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_accessed(&self) -> DateTime<Utc> {
        self.last_accessed
    }

    pub fn attributes(&self) -> &HashMap<String, Value> {
        &self.attributes
    }

    pub(crate) fn attributes_mut(&mut self) -> &mut HashMap<String, Value> {
        &mut self.attributes
    }

    /// Idle for strictly longer than `ttl` as of `now`.
    ///
    /// A TTL too large to represent never expires.
    pub fn is_expired(&self, ttl: TimeDelta, now: DateTime<Utc>) -> bool {
        match self.last_accessed.checked_add_signed(ttl) {
            Some(deadline) => deadline < now,
            None => false,
        }
    }
}

/// Store counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Sessions currently live.
    pub live: usize,
    /// Sessions created since the store was built.
    pub created: u64,
    /// Sessions removed by an explicit destroy.
    pub destroyed: u64,
    /// Sessions reclaimed by GC.
    pub expired: u64,
    /// GC sweeps run.
    pub sweeps: u64,
}

/// State guarded by the store lock.
#[derive(Debug, Default)]
struct StoreInner {
    /// Session id -> node in `order`.
    table: HashMap<String, NodeId>,
    /// Most recently used at the front.
    order: RecencyList<SessionEntry>,
    stats: StoreStats,
}

impl StoreInner {
    /// Access stamp for the current operation.
    ///
    /// Never earlier than the current head, so the list stays sorted even if
    /// the clock steps backwards.
    fn stamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.order.front().and_then(|h| self.order.get(h)) {
            Some(head) if head.last_accessed > now => head.last_accessed,
            _ => now,
        }
    }

    fn touch(&mut self, node: NodeId, now: DateTime<Utc>) {
        let stamp = self.stamp(now);
        if let Some(entry) = self.order.get_mut(node) {
            entry.last_accessed = stamp;
        }
        self.order.move_to_front(node);
    }
}

struct Shared {
    inner: Mutex<StoreInner>,
    clock: Arc<dyn Clock>,
}

/// In-memory session provider.
///
/// A hash table maps each session id to its node in an arena-backed
/// recency list. Every access moves the node to the front, so the back of
/// the list always holds the session idle the longest and GC can stop at
/// the first live entry it meets.
///
/// All operations take one store-wide lock. Clones share the same store.
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("live", &self.len())
            .finish()
    }
}

impl MemoryStore {
    /// Create an empty store on the wall clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Create an empty store on a custom clock.
    pub fn with_clock(clock: impl Clock) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(StoreInner::default()),
                clock: Arc::new(clock),
            }),
        }
    }

    /// Create a session with empty attributes at the front of the order.
    ///
    /// A live session with the same id is left untouched and the call fails
    /// with [`Error::AlreadyExists`].
    pub fn create(&self, id: &str) -> Result<SessionHandle> {
        let mut inner = self.shared.inner.lock();
        if inner.table.contains_key(id) {
            debug!(session_id = %id, "Rejecting duplicate session id");
            return Err(Error::AlreadyExists(id.to_string()));
        }

        let now = inner.stamp(self.shared.clock.now());
        let node = inner.order.push_front(SessionEntry::new(id.to_string(), now));
        inner.table.insert(id.to_string(), node);
        inner.stats.created += 1;

        debug!(session_id = %id, live = inner.table.len(), "Session created");
        Ok(SessionHandle::new(id.to_string(), self.clone()))
    }

    /// Look up a live session and mark it as used.
    pub fn read(&self, id: &str) -> Result<SessionHandle> {
        if self.touch(id) {
            trace!(session_id = %id, "Session read");
            Ok(SessionHandle::new(id.to_string(), self.clone()))
        } else {
            Err(Error::NotFound(id.to_string()))
        }
    }

    /// Refresh a session's access time and move it to the front.
    ///
    /// Returns `false` if the session is not live.
    pub fn touch(&self, id: &str) -> bool {
        let now = self.shared.clock.now();
        let mut inner = self.shared.inner.lock();
        match inner.table.get(id).copied() {
            Some(node) => {
                inner.touch(node, now);
                true
            }
            None => false,
        }
    }

    /// Remove a session. Missing ids are not an error.
    pub fn destroy(&self, id: &str) -> Result<()> {
        let mut inner = self.shared.inner.lock();
        match inner.table.remove(id) {
            Some(node) => {
                inner.order.remove(node);
                inner.stats.destroyed += 1;
                debug!(session_id = %id, "Session destroyed");
            }
            None => trace!(session_id = %id, "Destroy on missing session"),
        }
        Ok(())
    }

    /// Reclaim every session idle for longer than `ttl`.
    ///
    /// Walks from the least recently used end and stops at the first live
    /// session. Returns the number of sessions removed.
    pub fn gc(&self, ttl: Duration) -> usize {
        match TimeDelta::from_std(ttl) {
            Ok(ttl) => self.sweep(ttl),
            Err(_) => {
                self.shared.inner.lock().stats.sweeps += 1;
                0
            }
        }
    }

    /// [`gc`](Self::gc) with a TTL in whole seconds. Negative values act as zero.
    pub fn gc_secs(&self, ttl_secs: i64) -> usize {
        match TimeDelta::try_seconds(ttl_secs.max(0)) {
            Some(ttl) => self.sweep(ttl),
            None => {
                self.shared.inner.lock().stats.sweeps += 1;
                0
            }
        }
    }

    fn sweep(&self, ttl: TimeDelta) -> usize {
        let mut inner = self.shared.inner.lock();
        let now = self.shared.clock.now();
        let mut removed = 0;

        while let Some(tail) = inner.order.back() {
            let expired = inner
                .order
                .get(tail)
                .is_some_and(|entry| entry.is_expired(ttl, now));
            if !expired {
                break;
            }
            if let Some(entry) = inner.order.remove(tail) {
                inner.table.remove(&entry.id);
                trace!(
                    session_id = %entry.id,
                    last_accessed = %entry.last_accessed,
                    "Expired session removed"
                );
                removed += 1;
            }
        }

        inner.stats.sweeps += 1;
        inner.stats.expired += removed as u64;
        if removed > 0 {
            debug!(
                removed = removed,
                live = inner.table.len(),
                "GC sweep reclaimed sessions"
            );
        }
        removed
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.shared.inner.lock().table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.inner.lock().table.is_empty()
    }

    /// Whether a session is live. Does not touch it.
    pub fn contains(&self, id: &str) -> bool {
        self.shared.inner.lock().table.contains_key(id)
    }

    /// Live session ids, most recently used first.
    pub fn ids(&self) -> Vec<String> {
        let inner = self.shared.inner.lock();
        inner.order.iter().map(|(_, e)| e.id.clone()).collect()
    }

    /// Copy of a session's state without touching it.
    pub fn snapshot(&self, id: &str) -> Option<SessionEntry> {
        let inner = self.shared.inner.lock();
        let node = inner.table.get(id).copied()?;
        inner.order.get(node).cloned()
    }

    /// Copies of every live session, most recently used first.
    pub fn entries(&self) -> Vec<SessionEntry> {
        let inner = self.shared.inner.lock();
        inner.order.iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn stats(&self) -> StoreStats {
        let inner = self.shared.inner.lock();
        StoreStats {
            live: inner.table.len(),
            ..inner.stats.clone()
        }
    }

    /// Drop every session. Counters are kept.
    pub fn clear(&self) {
        let mut inner = self.shared.inner.lock();
        let dropped = inner.table.len() as u64;
        inner.table.clear();
        inner.order.clear();
        inner.stats.destroyed += dropped;
    }

    /// Check that the table and the list agree and that the list is sorted
    /// by access time.
    pub fn validate(&self) -> Result<()> {
        let inner = self.shared.inner.lock();

        if inner.table.len() != inner.order.len() {
            return Err(Error::Inconsistent(format!(
                "table has {} ids but order has {} nodes",
                inner.table.len(),
                inner.order.len()
            )));
        }

        let mut previous: Option<DateTime<Utc>> = None;
        let mut walked = 0;
        for (node, entry) in inner.order.iter() {
            walked += 1;
            if inner.table.get(&entry.id) != Some(&node) {
                return Err(Error::Inconsistent(format!(
                    "session {} is not mapped to its node",
                    entry.id
                )));
            }
            if previous.is_some_and(|p| p < entry.last_accessed) {
                return Err(Error::Inconsistent(format!(
                    "session {} is out of recency order",
                    entry.id
                )));
            }
            previous = Some(entry.last_accessed);
        }

        if walked != inner.order.len() {
            return Err(Error::Inconsistent(format!(
                "walked {} nodes but order reports {}",
                walked,
                inner.order.len()
            )));
        }
        Ok(())
    }

    /// Touch a live session and run `f` on it under the store lock.
    pub(crate) fn access<F, R>(&self, id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut SessionEntry) -> R,
    {
        let now = self.shared.clock.now();
        let mut inner = self.shared.inner.lock();
        let node = inner.table.get(id).copied()?;
        inner.touch(node, now);
        inner.order.get_mut(node).map(f)
    }
}
