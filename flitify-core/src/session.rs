//! Session state derived from the stored bearer token
//!
//! Nothing is cached: every check re-reads the store and re-decodes the
//! token, because expiry depends on the current time. Any check that fails
//! clears the token on the spot.

use std::sync::Arc;

use crate::token::decode_payload;
use crate::token_store::{TokenStore, TokenStoreError};

/// Login state over a shared token store
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn TokenStore>,
}

impl Session {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// Raw stored token, valid or not
    pub fn token(&self) -> Option<String> {
        self.store.get()
    }

    /// Whether a structurally valid, unexpired token is stored
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated_at(unix_now())
    }

    /// Same as [`Session::is_authenticated`] against an explicit clock
    pub fn is_authenticated_at(&self, now: i64) -> bool {
        let Some(token) = self.store.get() else {
            return false;
        };

        match decode_payload(&token) {
            Ok(payload) if !payload.is_expired_at(now) => true,
            Ok(_) => {
                tracing::debug!("Stored token has expired, logging out");
                self.logout();
                false
            }
            Err(e) => {
                tracing::debug!("Stored token is malformed ({}), logging out", e);
                self.logout();
                false
            }
        }
    }

    /// Store a freshly issued token. The token's shape is not checked here.
    pub fn login(&self, token: &str) -> Result<(), TokenStoreError> {
        self.store.set(token)?;
        tracing::info!("Session started for {}", self.username());
        Ok(())
    }

    /// Drop the stored token. Safe to call with no token stored.
    pub fn logout(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!("Failed to clear stored token: {}", e);
        }
    }

    /// Username claim of the stored token, or [`crate::UNKNOWN_USERNAME`]
    pub fn username(&self) -> String {
        self.store
            .get()
            .and_then(|token| decode_payload(&token).ok())
            .and_then(|payload| payload.username)
            .unwrap_or_else(|| crate::UNKNOWN_USERNAME.to_string())
    }
}

/// Current time in Unix seconds
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_store::MemoryTokenStore;

    const ALICE: &str = "header.eyJ1c2VybmFtZSI6ImFsaWNlIiwiZXhwIjo5OTk5OTk5OTk5fQ.sig";
    // {"username":"bob","exp":1000}
    const BOB_EXPIRED: &str = "h.eyJ1c2VybmFtZSI6ImJvYiIsImV4cCI6MTAwMH0.s";

    fn session_with(token: Option<&str>) -> (Session, Arc<MemoryTokenStore>) {
        let store = Arc::new(match token {
            Some(t) => MemoryTokenStore::with_token(t),
            None => MemoryTokenStore::new(),
        });
        (Session::new(store.clone()), store)
    }

    #[test]
    fn test_valid_token() {
        let (session, store) = session_with(Some(ALICE));
        assert!(session.is_authenticated());
        assert_eq!(session.username(), "alice");
        assert_eq!(store.get().as_deref(), Some(ALICE));
    }

    #[test]
    fn test_no_token() {
        let (session, _) = session_with(None);
        assert!(!session.is_authenticated());
        assert_eq!(session.username(), crate::UNKNOWN_USERNAME);
    }

    #[test]
    fn test_wrong_segment_count_clears() {
        for token in ["abc", "a.b", "a.b.c.d", "a..b.c"] {
            let (session, store) = session_with(Some(token));
            assert!(!session.is_authenticated(), "{token} should be rejected");
            assert_eq!(store.get(), None);
        }
    }

    #[test]
    fn test_undecodable_payload_clears() {
        for token in ["h.%%%.s", "h.bm90IGpzb24.s", "h..s"] {
            let (session, store) = session_with(Some(token));
            assert!(!session.is_authenticated(), "{token} should be rejected");
            assert_eq!(store.get(), None);
        }
    }

    #[test]
    fn test_expired_token_clears() {
        let (session, store) = session_with(Some(BOB_EXPIRED));
        assert!(!session.is_authenticated_at(1000));
        assert_eq!(store.get(), None);

        // Second check is a quiet no-op
        assert!(!session.is_authenticated_at(1000));
    }

    #[test]
    fn test_expiry_is_time_dependent() {
        let (session, _) = session_with(Some(BOB_EXPIRED));
        assert!(session.is_authenticated_at(999));
        assert!(!session.is_authenticated_at(1001));
    }

    #[test]
    fn test_username_does_not_clear() {
        let (session, store) = session_with(Some("garbage"));
        assert_eq!(session.username(), crate::UNKNOWN_USERNAME);
        assert_eq!(store.get().as_deref(), Some("garbage"));
    }

    #[test]
    fn test_login_logout() {
        let (session, store) = session_with(None);

        session.login("any.thing.here").unwrap();
        assert_eq!(store.get().as_deref(), Some("any.thing.here"));

        session.logout();
        assert_eq!(store.get(), None);

        session.logout();
        session.logout();
        assert_eq!(store.get(), None);
    }
}
