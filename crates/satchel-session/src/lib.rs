//! In-memory session store with recency-ordered expiry.
//!
//! This crate provides:
//! - [`MemoryStore`]: a session table over an arena-backed recency list with
//!   O(1) touch and O(1) removal of the least recently used session
//! - [`SessionHandle`]: key-value access to one session; every access
//!   refreshes its recency
//! - [`SessionManager`]: resume-or-create semantics and id generation over
//!   any injected [`SessionProvider`]
//! - [`GcTask`]: a periodic sweeper with explicit start/stop
//!
//! # Example
//!
//! ```rust,ignore
//! use satchel_session::{MemoryStore, SessionManager, StoreConfig};
//!
//! let config = StoreConfig::default().with_ttl(Duration::from_secs(1800));
//! let manager = SessionManager::new(MemoryStore::new(), config);
//!
//! let started = manager.start(cookie_value.as_deref())?;
//! started.session.set("user_id", 42)?;
//! let gc = manager.spawn_gc()?;
//! ```

mod clock;
mod config;
mod error;
mod manager;
mod provider;
mod recency;
mod session;
mod store;
mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DEFAULT_TTL, StoreConfig};
pub use error::{Error, Result};
pub use manager::{SessionManager, StartedSession};
pub use provider::SessionProvider;
pub use recency::{Iter, NodeId, RecencyList};
pub use session::{Session, SessionHandle};
pub use store::{MemoryStore, SessionEntry, StoreStats};
pub use sweeper::{GcHandle, GcTask};
