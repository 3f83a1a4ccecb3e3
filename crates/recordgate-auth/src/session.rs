//! Server-side session store and the session-cookie authenticator
//!
//! A session maps a random identifier (carried in a client cookie) to a small
//! set of named values: the one-time CSRF `state` for the OAuth round trip,
//! the PKCE verifier that travels with it, and the access token stored by a
//! successful callback. The store is an explicit object handed to the
//! authenticator and the login/callback handlers - no ambient globals.
//!
//! Concurrent requests on one session race as last-write-wins; that window
//! only matters during a callback, and a second concurrent callback fails the
//! state match anyway because the state is consumed on first use.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::context::AuthContext;
use crate::error::AuthError;
use crate::types::{AuthRequest, Authenticator};

/// Access token held inside a session
#[derive(Debug, Clone)]
pub struct StoredToken {
    /// The opaque access token
    pub access_token: String,
    /// Expiry, if the issuer stated one
    pub expires_at: Option<SystemTime>,
}

impl StoredToken {
    /// Whether the token's expiry has passed
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => SystemTime::now() >= expires_at,
            None => false,
        }
    }
}

/// Per-client session state
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    /// One-time CSRF state for an in-flight authorization round trip
    pub state: Option<String>,
    /// PKCE verifier bound to the same round trip
    pub pkce_verifier: Option<String>,
    /// Access token stored by a successful callback
    pub token: Option<StoredToken>,
}

/// Keyed store of per-client sessions
#[async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    /// Create a fresh session and return its identifier
    async fn create(&self) -> String;

    /// Load a session by identifier
    async fn load(&self, session_id: &str) -> Option<SessionData>;

    /// Store a session wholesale (last write wins)
    async fn store(&self, session_id: &str, data: SessionData);

    /// Take the one-time state and verifier out of a session, consuming them
    ///
    /// Returns `None` when the session has no pending state. Single use: a
    /// second take always misses.
    async fn take_login_state(&self, session_id: &str) -> Option<(String, Option<String>)>;
}

/// Entry in the in-memory store
#[derive(Debug)]
struct SessionEntry {
    data: SessionData,
    created_at: SystemTime,
}

/// In-memory session store with a per-session TTL
///
/// Expired sessions vanish on read; no background sweeper is needed at this
/// scale.
#[derive(Debug)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl MemorySessionStore {
    /// Create a store whose sessions live for `ttl` after creation
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    fn is_live(&self, entry: &SessionEntry) -> bool {
        entry
            .created_at
            .elapsed()
            .map(|age| age < self.ttl)
            .unwrap_or(false)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self) -> String {
        let session_id = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write().await;
        sessions.insert(
            session_id.clone(),
            SessionEntry {
                data: SessionData::default(),
                created_at: SystemTime::now(),
            },
        );
        session_id
    }

    async fn load(&self, session_id: &str) -> Option<SessionData> {
        {
            let sessions = self.sessions.read().await;
            if let Some(entry) = sessions.get(session_id) {
                if self.is_live(entry) {
                    return Some(entry.data.clone());
                }
            } else {
                return None;
            }
        }

        // Entry exists but has expired; drop it.
        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get(session_id) {
            if !self.is_live(entry) {
                sessions.remove(session_id);
                debug!(session_id, "expired session removed");
            } else {
                return Some(entry.data.clone());
            }
        }
        None
    }

    async fn store(&self, session_id: &str, data: SessionData) {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry {
                data: SessionData::default(),
                created_at: SystemTime::now(),
            });
        entry.data = data;
    }

    async fn take_login_state(&self, session_id: &str) -> Option<(String, Option<String>)> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(session_id)?;
        let state = entry.data.state.take()?;
        let verifier = entry.data.pkce_verifier.take();
        Some((state, verifier))
    }
}

/// Session-cookie authenticator
///
/// A read-only check: session exists, holds a token, and the token's expiry
/// has not passed. Never refreshes tokens on the caller's behalf. The
/// rejection message points the caller at the login endpoint.
#[derive(Debug)]
pub struct SessionAuthenticator<S> {
    store: std::sync::Arc<S>,
    login_path: String,
}

impl<S: SessionStore> SessionAuthenticator<S> {
    /// Create an authenticator over the given store
    pub fn new(store: std::sync::Arc<S>, login_path: impl Into<String>) -> Self {
        Self {
            store,
            login_path: login_path.into(),
        }
    }

    /// The login endpoint advertised on rejection
    pub fn login_path(&self) -> &str {
        &self.login_path
    }
}

#[async_trait]
impl<S: SessionStore> Authenticator for SessionAuthenticator<S> {
    fn name(&self) -> &'static str {
        "session-oauth"
    }

    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthContext, AuthError> {
        let not_authenticated =
            || AuthError::invalid(format!("not authenticated; log in at {}", self.login_path));

        let session_id = request.session_cookie.as_deref().ok_or(AuthError::Required)?;

        let session = self
            .store
            .load(session_id)
            .await
            .ok_or_else(not_authenticated)?;

        let token = session.token.ok_or_else(not_authenticated)?;
        if token.is_expired() {
            debug!(session_id, "session token expired");
            return Err(not_authenticated());
        }

        let mut ctx = AuthContext::new(session_id, self.name());
        ctx.expires_at = token.expires_at;
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthErrorKind;
    use std::sync::Arc;

    fn store() -> Arc<MemorySessionStore> {
        Arc::new(MemorySessionStore::new(Duration::from_secs(3600)))
    }

    #[tokio::test]
    async fn create_then_load_round_trips() {
        let store = store();
        let sid = store.create().await;
        assert!(store.load(&sid).await.is_some());
        assert!(store.load("unknown").await.is_none());
    }

    #[tokio::test]
    async fn expired_sessions_vanish_on_read() {
        let store = MemorySessionStore::new(Duration::ZERO);
        let sid = store.create().await;
        assert!(store.load(&sid).await.is_none());
    }

    #[tokio::test]
    async fn login_state_is_single_use() {
        let store = store();
        let sid = store.create().await;
        store
            .store(
                &sid,
                SessionData {
                    state: Some("csrf-state".to_string()),
                    pkce_verifier: Some("verifier".to_string()),
                    token: None,
                },
            )
            .await;

        let (state, verifier) = store.take_login_state(&sid).await.unwrap();
        assert_eq!(state, "csrf-state");
        assert_eq!(verifier.as_deref(), Some("verifier"));

        // Second take misses: the state is consumed.
        assert!(store.take_login_state(&sid).await.is_none());
    }

    #[tokio::test]
    async fn missing_cookie_is_required() {
        let auth = SessionAuthenticator::new(store(), "/auth/login");
        let err = auth
            .authenticate(&AuthRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::AuthRequired);
    }

    #[tokio::test]
    async fn session_without_token_is_invalid() {
        let store = store();
        let sid = store.create().await;
        let auth = SessionAuthenticator::new(store, "/auth/login");

        let err = auth
            .authenticate(&AuthRequest::session(sid))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::AuthInvalid);
        assert!(err.to_string().contains("/auth/login"));
    }

    #[tokio::test]
    async fn expired_token_is_invalid() {
        let store = store();
        let sid = store.create().await;
        store
            .store(
                &sid,
                SessionData {
                    state: None,
                    pkce_verifier: None,
                    token: Some(StoredToken {
                        access_token: "tok".to_string(),
                        expires_at: Some(SystemTime::now() - Duration::from_secs(1)),
                    }),
                },
            )
            .await;

        let auth = SessionAuthenticator::new(store, "/auth/login");
        let err = auth
            .authenticate(&AuthRequest::session(sid))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::AuthInvalid);
    }

    #[tokio::test]
    async fn live_token_authenticates() {
        let store = store();
        let sid = store.create().await;
        store
            .store(
                &sid,
                SessionData {
                    state: None,
                    pkce_verifier: None,
                    token: Some(StoredToken {
                        access_token: "tok".to_string(),
                        expires_at: Some(SystemTime::now() + Duration::from_secs(60)),
                    }),
                },
            )
            .await;

        let auth = SessionAuthenticator::new(store, "/auth/login");
        let ctx = auth
            .authenticate(&AuthRequest::session(sid.clone()))
            .await
            .unwrap();
        assert_eq!(ctx.subject, sid);
        assert_eq!(ctx.provider, "session-oauth");
    }
}
