//! Session storage.
//!
//! The backing store belongs to the host (cookies, database, cache); this
//! module defines the [`SessionStore`] contract, an in-memory reference
//! store, and the [`Session`] handle that handlers receive explicitly
//! through their [`ActionContext`](crate::ActionContext).

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

/// Error from a session operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The request carries no session id
    #[error("request has no session")]
    NoSession,
    /// The backing store failed
    #[error("session store failure: {0}")]
    Store(String),
}

/// Key/value storage keyed by session id.
///
/// A session springs into existence on the first `set` for its id and is
/// removed by `destroy` (logout) or by the host's expiry.
pub trait SessionStore: Send + Sync {
    /// Reads a value.
    fn get(&self, session_id: &str, key: &str) -> Option<Value>;

    /// Writes a value, creating the session if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] if the backing store fails.
    fn set(&self, session_id: &str, key: &str, value: Value) -> Result<(), SessionError>;

    /// Returns `true` if the key is present.
    fn has(&self, session_id: &str, key: &str) -> bool {
        self.get(session_id, key).is_some()
    }

    /// Removes a value, returning it.
    fn remove(&self, session_id: &str, key: &str) -> Option<Value>;

    /// Drops the whole session.
    fn destroy(&self, session_id: &str);
}

/// In-memory [`SessionStore`].
///
/// Suitable for tests and single-process deployments; sessions live until
/// destroyed.
///
/// # Examples
///
/// ```
/// use action_pipeline::{MemorySessionStore, SessionStore};
/// use serde_json::json;
///
/// let store = MemorySessionStore::new();
/// store.set("sid-1", "page", json!({"limit": 50})).unwrap();
///
/// assert!(store.has("sid-1", "page"));
/// assert!(!store.has("sid-2", "page"));
/// ```
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, HashMap<String, Value>>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, session_id: &str, key: &str) -> Option<Value> {
        self.sessions.read().get(session_id)?.get(key).cloned()
    }

    fn set(&self, session_id: &str, key: &str, value: Value) -> Result<(), SessionError> {
        self.sessions
            .write()
            .entry(session_id.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    fn has(&self, session_id: &str, key: &str) -> bool {
        self.sessions
            .read()
            .get(session_id)
            .is_some_and(|data| data.contains_key(key))
    }

    fn remove(&self, session_id: &str, key: &str) -> Option<Value> {
        self.sessions.write().get_mut(session_id)?.remove(key)
    }

    fn destroy(&self, session_id: &str) {
        self.sessions.write().remove(session_id);
    }
}

/// The current request's session.
///
/// A request without a session id gets a detached handle: reads return
/// nothing and writes fail with [`SessionError::NoSession`].
#[derive(Clone, Copy)]
pub struct Session<'a> {
    store: &'a dyn SessionStore,
    id: Option<&'a str>,
}

impl<'a> Session<'a> {
    pub(crate) fn new(store: &'a dyn SessionStore, id: Option<&'a str>) -> Self {
        Self { store, id }
    }

    /// Returns `true` if the request carries a session id.
    pub fn is_attached(&self) -> bool {
        self.id.is_some()
    }

    /// Reads a value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.store.get(self.id?, key)
    }

    /// Returns `true` if the key is present.
    pub fn has(&self, key: &str) -> bool {
        self.id.is_some_and(|id| self.store.has(id, key))
    }

    /// Writes a value.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoSession`] for a detached handle, or the
    /// store's error.
    pub fn set(&self, key: &str, value: Value) -> Result<(), SessionError> {
        let id = self.id.ok_or(SessionError::NoSession)?;
        self.store.set(id, key, value)
    }

    /// Removes a value, returning it.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.store.remove(self.id?, key)
    }

    /// Destroys the session (logout).
    pub fn destroy(&self) {
        if let Some(id) = self.id {
            self.store.destroy(id);
        }
    }
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("attached", &self.id.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn session_created_lazily_on_set() {
        let store = MemorySessionStore::new();
        assert_eq!(store.session_count(), 0);
        assert!(store.get("sid", "k").is_none());
        assert_eq!(store.session_count(), 0);

        store.set("sid", "k", json!(1)).unwrap();
        assert_eq!(store.session_count(), 1);
        assert_eq!(store.get("sid", "k"), Some(json!(1)));
    }

    #[test]
    fn remove_and_destroy() {
        let store = MemorySessionStore::new();
        store.set("sid", "a", json!("x")).unwrap();
        store.set("sid", "b", json!("y")).unwrap();

        assert_eq!(store.remove("sid", "a"), Some(json!("x")));
        assert!(!store.has("sid", "a"));
        assert!(store.has("sid", "b"));

        store.destroy("sid");
        assert!(!store.has("sid", "b"));
        assert_eq!(store.session_count(), 0);
    }

    #[test]
    fn sessions_are_isolated() {
        let store = MemorySessionStore::new();
        store.set("one", "k", json!(1)).unwrap();
        store.set("two", "k", json!(2)).unwrap();

        assert_eq!(store.get("one", "k"), Some(json!(1)));
        assert_eq!(store.get("two", "k"), Some(json!(2)));
    }

    #[test]
    fn attached_handle() {
        let store = MemorySessionStore::new();
        let session = Session::new(&store, Some("sid"));

        session.set("filter", json!("web")).unwrap();
        assert!(session.has("filter"));
        assert_eq!(session.get("filter"), Some(json!("web")));
        assert_eq!(session.remove("filter"), Some(json!("web")));

        session.set("x", json!(1)).unwrap();
        session.destroy();
        assert_eq!(store.session_count(), 0);
    }

    #[test]
    fn detached_handle() {
        let store = MemorySessionStore::new();
        let session = Session::new(&store, None);

        assert!(!session.is_attached());
        assert_eq!(session.set("k", json!(1)), Err(SessionError::NoSession));
        assert!(session.get("k").is_none());
        assert!(!session.has("k"));
        assert_eq!(store.session_count(), 0);
    }
}
