use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Credentials returned by `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default = "bearer")]
    pub token_type: String,
}

fn bearer() -> String {
    "bearer".to_string()
}

impl Session {
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: bearer(),
        }
    }
}

/// Process-wide sign-in state. Clones share the same session.
#[derive(Clone)]
pub struct SessionStore {
    current: Arc<watch::Sender<Option<Session>>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            current: Arc::new(tx),
        }
    }

    pub fn sign_in(&self, session: Session) {
        log_info!("Signed in ({} token)", session.token_type);
        self.current.send_replace(Some(session));
    }

    pub fn sign_out(&self) {
        if self.current.send_replace(None).is_some() {
            log_info!("Signed out");
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.current.borrow().clone()
    }

    pub fn bearer_token(&self) -> Option<String> {
        self.current
            .borrow()
            .as_ref()
            .map(|session| session.access_token.clone())
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.borrow().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.current.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_in_and_out_notify_subscribers() {
        let store = SessionStore::new();
        let mut changes = store.subscribe();
        assert!(!store.is_signed_in());

        store.sign_in(Session::bearer("abc"));
        changes.changed().await.unwrap();
        assert_eq!(changes.borrow().as_ref().map(|s| s.access_token.as_str()), Some("abc"));
        assert_eq!(store.bearer_token().as_deref(), Some("abc"));

        store.sign_out();
        changes.changed().await.unwrap();
        assert!(changes.borrow().is_none());
        assert!(store.bearer_token().is_none());
    }

    #[test]
    fn clones_share_state() {
        let store = SessionStore::new();
        let other = store.clone();
        other.sign_in(Session::bearer("t"));
        assert!(store.is_signed_in());
    }

    #[test]
    fn token_type_defaults_to_bearer() {
        let session: Session = serde_json::from_str(r#"{"access_token":"x"}"#).unwrap();
        assert_eq!(session.token_type, "bearer");
    }
}
