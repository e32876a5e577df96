//! The session store.
//!
//! No ambient global state: sessions live here, keyed by id. Each entry
//! is guarded by its own async mutex, so turns for one session serialize
//! while different sessions proceed independently — no cross-session
//! locking exists anywhere in the engine.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use colloquy_core::{SessionId, UserProfile};

use crate::session::Session;

/// Store of live sessions, keyed and locked per session id.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, Arc<Mutex<Session>>>,
}

impl SessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for a user and return its id.
    pub fn create(&self, user: UserProfile) -> SessionId {
        let session = Session::new(user);
        let id = session.id.clone();
        self.sessions
            .insert(id.clone(), Arc::new(Mutex::new(session)));
        info!(session_id = %id, "Created session");
        id
    }

    /// Insert an existing session (e.g. restored from storage).
    pub fn insert(&self, session: Session) {
        self.sessions
            .insert(session.id.clone(), Arc::new(Mutex::new(session)));
    }

    /// Get the guarded entry for a session.
    #[must_use]
    pub fn get(&self, id: &SessionId) -> Option<Arc<Mutex<Session>>> {
        self.sessions.get(id).map(|entry| Arc::clone(&entry))
    }

    /// Remove a session entirely.
    pub fn remove(&self, id: &SessionId) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            info!(session_id = %id, "Destroyed session");
        }
        removed
    }

    /// Reset a session: conversation and metadata are cleared, identity
    /// and selections survive.
    pub async fn reset(&self, id: &SessionId) -> bool {
        let Some(entry) = self.get(id) else {
            return false;
        };
        let mut session = entry.lock().await;
        session.clear_messages();
        session.metadata = crate::session::SessionMetadata::default();
        info!(session_id = %id, "Reset session");
        true
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_llm::Message;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = SessionStore::new();
        let id = store.create(UserProfile::new("alice"));

        let entry = store.get(&id).unwrap();
        let session = entry.lock().await;
        assert_eq!(session.user.username, "alice");
    }

    #[tokio::test]
    async fn test_get_unknown_is_none() {
        let store = SessionStore::new();
        assert!(store.get(&SessionId::new()).is_none());
    }

    #[tokio::test]
    async fn test_reset_clears_messages_keeps_identity() {
        let store = SessionStore::new();
        let id = store.create(UserProfile::new("alice"));

        {
            let entry = store.get(&id).unwrap();
            let mut session = entry.lock().await;
            session.add_message(Message::user("hello"));
            session.metadata.turn_count = 3;
        }

        assert!(store.reset(&id).await);

        let entry = store.get(&id).unwrap();
        let session = entry.lock().await;
        assert!(session.messages.is_empty());
        assert_eq!(session.metadata.turn_count, 0);
        assert_eq!(session.user.username, "alice");
    }

    #[tokio::test]
    async fn test_remove() {
        let store = SessionStore::new();
        let id = store.create(UserProfile::new("alice"));
        assert!(store.remove(&id));
        assert!(!store.remove(&id));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = SessionStore::new();
        let id_a = store.create(UserProfile::new("alice"));
        let id_b = store.create(UserProfile::new("bob"));

        // Holding one session's lock does not block the other's.
        let entry_a = store.get(&id_a).unwrap();
        let _guard_a = entry_a.lock().await;

        let entry_b = store.get(&id_b).unwrap();
        let guard_b = entry_b.lock().await;
        assert_eq!(guard_b.user.username, "bob");
    }
}
