//! Session handles and the polymorphic session capability.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::store::MemoryStore;

/// Key-value access to one session.
///
/// Every call counts as use of the session and refreshes its recency.
pub trait Session: Send + Sync {
    /// The session's immutable id.
    fn id(&self) -> &str;

    /// Insert or overwrite an attribute.
    fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Read an attribute. Absence is a normal outcome.
    fn get(&self, key: &str) -> Option<Value>;

    /// Remove an attribute if present.
    fn delete(&self, key: &str) -> Result<()>;
}

/// Handle to a session held by a [`MemoryStore`].
///
/// The handle carries only the id; every operation goes back through the
/// store lock, so it never aliases store-owned state. Once the session is
/// destroyed or expires, writes fail with [`Error::NotFound`] and reads
/// return `None`.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: String,
    store: MemoryStore,
}

impl SessionHandle {
    pub(crate) fn new(id: String, store: MemoryStore) -> Self {
        Self { id, store }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Insert or overwrite an attribute, then touch the session.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        let value = value.into();
        self.store
            .access(&self.id, |entry| {
                entry.attributes_mut().insert(key, value);
            })
            .ok_or_else(|| self.not_found())
    }

    /// Serialize `value` and store it under `key`.
    pub fn set_serialized<T: Serialize>(&self, key: impl Into<String>, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.set(key, value)
    }

    /// Read an attribute, touching the session.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.store
            .access(&self.id, |entry| entry.attributes().get(key).cloned())
            .flatten()
    }

    /// Read an attribute and deserialize it.
    ///
    /// A missing key is `Ok(None)`; a value of the wrong shape is an error.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Remove an attribute if present, then touch the session.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.store
            .access(&self.id, |entry| {
                entry.attributes_mut().remove(key);
            })
            .ok_or_else(|| self.not_found())
    }

    /// Attribute keys, touching the session.
    pub fn keys(&self) -> Vec<String> {
        self.store
            .access(&self.id, |entry| entry.attributes().keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of attributes, touching the session. Zero once the session is gone.
    pub fn len(&self) -> usize {
        self.store
            .access(&self.id, |entry| entry.attributes().len())
            .unwrap_or(0)
    }

    /// Whether the session holds no attributes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Refresh the session without reading or writing attributes.
    pub fn touch(&self) -> bool {
        self.store.touch(&self.id)
    }

    /// Whether the session is still live. Does not touch it.
    pub fn is_live(&self) -> bool {
        self.store.contains(&self.id)
    }

    fn not_found(&self) -> Error {
        Error::NotFound(self.id.clone())
    }
}

impl Session for SessionHandle {
    fn id(&self) -> &str {
        SessionHandle::id(self)
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        SessionHandle::set(self, key, value)
    }

    fn get(&self, key: &str) -> Option<Value> {
        SessionHandle::get(self, key)
    }

    fn delete(&self, key: &str) -> Result<()> {
        SessionHandle::delete(self, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use chrono::TimeDelta;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_set_then_get() {
        let store = MemoryStore::new();
        let session = store.create("s1").unwrap();

        session.set("name", "alice").unwrap();
        session.set("visits", 3).unwrap();

        assert_eq!(session.get("name"), Some(json!("alice")));
        assert_eq!(session.get("visits"), Some(json!(3)));
        assert_eq!(session.get("missing"), None);
    }

    #[test]
    fn test_set_overwrites() {
        let store = MemoryStore::new();
        let session = store.create("s1").unwrap();
        session.set("k", 1).unwrap();
        session.set("k", 2).unwrap();

        assert_eq!(session.get("k"), Some(json!(2)));
        assert_eq!(session.keys(), vec!["k".to_string()]);
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_delete_then_get() {
        let store = MemoryStore::new();
        let session = store.create("s1").unwrap();
        session.set("k", true).unwrap();

        session.delete("k").unwrap();
        assert_eq!(session.get("k"), None);

        // Deleting an absent key is fine
        session.delete("k").unwrap();
    }

    #[test]
    fn test_handles_share_state() {
        let store = MemoryStore::new();
        let created = store.create("s1").unwrap();
        created.set("cart", json!(["apple"])).unwrap();

        let read = store.read("s1").unwrap();
        assert_eq!(read.get("cart"), Some(json!(["apple"])));
    }

    #[test]
    fn test_every_access_touches() {
        let clock = ManualClock::starting_now();
        let store = MemoryStore::with_clock(clock.clone());
        let a = store.create("a").unwrap();
        let b = store.create("b").unwrap();

        clock.advance(TimeDelta::seconds(1));
        a.get("x");
        assert_eq!(store.ids(), vec!["a", "b"]);

        clock.advance(TimeDelta::seconds(1));
        b.set("x", 1).unwrap();
        assert_eq!(store.ids(), vec!["b", "a"]);

        clock.advance(TimeDelta::seconds(1));
        a.delete("x").unwrap();
        assert_eq!(store.ids(), vec!["a", "b"]);
        assert_eq!(store.snapshot("a").unwrap().last_accessed(), clock.now());
    }

    #[test]
    fn test_destroyed_session_handle() {
        let store = MemoryStore::new();
        let session = store.create("s1").unwrap();
        session.set("k", 1).unwrap();
        store.destroy("s1").unwrap();

        assert!(!session.is_live());
        assert_eq!(session.get("k"), None);
        assert!(matches!(session.set("k", 2), Err(Error::NotFound(_))));
        assert!(matches!(session.delete("k"), Err(Error::NotFound(_))));
        assert!(!session.touch());
        assert!(store.is_empty());
    }

    #[test]
    fn test_typed_attributes() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Cart {
            items: Vec<String>,
            total_cents: u64,
        }

        let store = MemoryStore::new();
        let session = store.create("s1").unwrap();
        let cart = Cart {
            items: vec!["pear".into()],
            total_cents: 120,
        };
        session.set_serialized("cart", &cart).unwrap();

        let loaded: Option<Cart> = session.get_as("cart").unwrap();
        assert_eq!(loaded, Some(cart));

        let missing: Option<Cart> = session.get_as("nothing").unwrap();
        assert!(missing.is_none());

        session.set("cart", "not a cart").unwrap();
        let wrong: Result<Option<Cart>> = session.get_as("cart");
        assert!(matches!(wrong, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_session_trait_object() {
        let store = MemoryStore::new();
        let handle = store.create("s1").unwrap();
        let session: &dyn Session = &handle;

        session.set("k", json!("v")).unwrap();
        assert_eq!(session.id(), "s1");
        assert_eq!(session.get("k"), Some(json!("v")));
        session.delete("k").unwrap();
        assert_eq!(session.get("k"), None);
    }
}
