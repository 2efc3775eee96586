use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// The authenticated user as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
}

/// In-memory session state: the single source of truth for credentials.
///
/// Access and refresh tokens are set and cleared together with the user;
/// a session with only some fields present cannot authenticate requests.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub user: Option<User>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.access_token.is_some()
    }
}

/// Shared handle to the session. Constructed once at startup and cloned into
/// every component that reads or mutates credentials (API client, expiry
/// notifier, app). Clone is cheap - the state lives behind an `Arc`.
///
/// The session is deliberately not persisted to disk; it lives only for the
/// lifetime of the process.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace user and both tokens atomically. A login response without a
    /// refresh token yields a session that cannot be silently extended; the
    /// HTTP layer treats that as an unrecoverable state on the first 403.
    pub fn set(&self, user: User, access_token: String, refresh_token: Option<String>) {
        let mut state = self.inner.write().expect("session lock poisoned");
        state.user = Some(user);
        state.access_token = Some(access_token);
        state.refresh_token = refresh_token;
    }

    /// Reset to the empty session. Idempotent.
    pub fn clear(&self) {
        let mut state = self.inner.write().expect("session lock poisoned");
        *state = SessionState::default();
    }

    /// Owned copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.inner.read().expect("session lock poisoned").clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner
            .read()
            .expect("session lock poisoned")
            .access_token
            .clone()
    }

    pub fn user(&self) -> Option<User> {
        self.inner.read().expect("session lock poisoned").user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner
            .read()
            .expect("session lock poisoned")
            .is_authenticated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 1,
            email: "a@x.com".to_string(),
        }
    }

    #[test]
    fn test_set_replaces_all_fields() {
        let store = SessionStore::new();
        store.set(user(), "A1".to_string(), Some("R1".to_string()));

        let snap = store.snapshot();
        assert_eq!(snap.user, Some(user()));
        assert_eq!(snap.access_token.as_deref(), Some("A1"));
        assert_eq!(snap.refresh_token.as_deref(), Some("R1"));
        assert!(store.is_authenticated());
    }

    #[test]
    fn test_set_overwrites_previous_session() {
        let store = SessionStore::new();
        store.set(user(), "A1".to_string(), Some("R1".to_string()));
        store.set(user(), "A2".to_string(), Some("R2".to_string()));

        let snap = store.snapshot();
        assert_eq!(snap.access_token.as_deref(), Some("A2"));
        assert_eq!(snap.refresh_token.as_deref(), Some("R2"));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = SessionStore::new();
        store.set(user(), "A1".to_string(), Some("R1".to_string()));

        store.clear();
        let once = store.snapshot();
        store.clear();
        let twice = store.snapshot();

        assert!(once.user.is_none() && once.access_token.is_none() && once.refresh_token.is_none());
        assert!(twice.user.is_none() && twice.access_token.is_none() && twice.refresh_token.is_none());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_clones_share_state() {
        let store = SessionStore::new();
        let handle = store.clone();
        handle.set(user(), "A1".to_string(), Some("R1".to_string()));
        assert_eq!(store.access_token().as_deref(), Some("A1"));
    }
}
