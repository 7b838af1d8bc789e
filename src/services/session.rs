//! User session store used by the Token Vault flow.
//!
//! A session is created by whatever login integration fronts the web routes
//! and is looked up by the `session` cookie. Besides the user's refresh token
//! it caches connection tokens so repeated Vault lookups reuse a still-valid
//! token instead of minting a new one each time.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::services::auth::token::BearerToken;
use crate::services::exchange::ConnectionToken;

pub const SESSION_COOKIE: &str = "session";

pub type SessionResult<T> = Result<T, SessionError>;

/// Kept apart from `AppError`; handlers decide how a store failure surfaces.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone)]
pub struct UserSession {
    pub session_id: String,
    pub user_id: String,
    pub refresh_token: BearerToken,
}

#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    fn backend_name(&self) -> &'static str;

    async fn get(&self, session_id: &str) -> SessionResult<Option<UserSession>>;

    async fn insert(&self, session: UserSession) -> SessionResult<()>;

    /// Drops the session and every connection token cached for it.
    async fn remove(&self, session_id: &str) -> SessionResult<()>;

    /// Cached token for `connection`, only if still fresh.
    async fn connection_token(
        &self,
        session_id: &str,
        connection: &str,
    ) -> SessionResult<Option<ConnectionToken>>;

    async fn store_connection_token(&self, session_id: &str, token: ConnectionToken) -> SessionResult<()>;

    /// Forget a cached token (e.g. after the downstream rejected it).
    async fn evict_connection_token(&self, session_id: &str, connection: &str) -> SessionResult<()>;
}

#[derive(Default)]
struct Entry {
    session: Option<UserSession>,
    connections: HashMap<String, ConnectionToken>,
}

/// Process-local store. Sessions vanish on restart.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, session_id: &str) -> SessionResult<Option<UserSession>> {
        let guard = self.inner.read().await;
        Ok(guard.get(session_id).and_then(|e| e.session.clone()))
    }

    async fn insert(&self, session: UserSession) -> SessionResult<()> {
        let mut guard = self.inner.write().await;
        let entry = guard.entry(session.session_id.clone()).or_default();
        entry.session = Some(session);
        Ok(())
    }

    async fn remove(&self, session_id: &str) -> SessionResult<()> {
        self.inner.write().await.remove(session_id);
        Ok(())
    }

    async fn connection_token(
        &self,
        session_id: &str,
        connection: &str,
    ) -> SessionResult<Option<ConnectionToken>> {
        let guard = self.inner.read().await;
        let now = Utc::now();
        Ok(guard
            .get(session_id)
            .and_then(|e| e.connections.get(connection))
            .filter(|t| t.is_fresh_at(now))
            .cloned())
    }

    async fn store_connection_token(&self, session_id: &str, token: ConnectionToken) -> SessionResult<()> {
        let mut guard = self.inner.write().await;
        // no session entry means the user logged out meanwhile
        if let Some(entry) = guard.get_mut(session_id) {
            entry.connections.insert(token.connection.clone(), token);
        }
        Ok(())
    }

    async fn evict_connection_token(&self, session_id: &str, connection: &str) -> SessionResult<()> {
        if let Some(entry) = self.inner.write().await.get_mut(session_id) {
            entry.connections.remove(connection);
        }
        Ok(())
    }
}
