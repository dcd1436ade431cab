//! Session registry: token-id → user-id entries with a TTL.
//!
//! Entry presence means "not revoked". Expiry here is independent of the
//! token's own signed expiry so an admin can force-logout a live session, or
//! let a revocation outlive the signature window. Every issued token gets
//! its own entry; two logins from two devices never evict each other.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use warden_core::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    /// Token identifier (`jti` claim), the registry key.
    pub token_id: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Registry failures are server errors: a transient lookup failure must
/// surface, never silently decide allow or deny.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session registry unavailable: {0}")]
    Unavailable(String),

    #[error("session entry could not be decoded: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// Store an entry under its token id with the given TTL.
    async fn put(&self, entry: SessionEntry, ttl: Duration) -> Result<(), SessionError>;

    /// Fetch a live entry; expired entries read as absent.
    async fn get(&self, token_id: &str) -> Result<Option<SessionEntry>, SessionError>;

    /// Delete an entry (proactive revocation). Returns whether it existed.
    async fn remove(&self, token_id: &str) -> Result<bool, SessionError>;
}

/// In-process registry used in tests and single-node deployments.
#[derive(Debug, Default)]
pub struct InMemorySessionRegistry {
    entries: RwLock<HashMap<String, (SessionEntry, DateTime<Utc>)>>,
}

impl InMemorySessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRegistry for InMemorySessionRegistry {
    async fn put(&self, entry: SessionEntry, ttl: Duration) -> Result<(), SessionError> {
        let expires_at = Utc::now() + ttl;
        let mut entries = self.entries.write().await;
        // Opportunistic cleanup keeps the map from growing unbounded.
        let now = Utc::now();
        entries.retain(|_, (_, exp)| *exp > now);
        entries.insert(entry.token_id.clone(), (entry, expires_at));
        Ok(())
    }

    async fn get(&self, token_id: &str) -> Result<Option<SessionEntry>, SessionError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(token_id)
            .filter(|(_, expires_at)| *expires_at > Utc::now())
            .map(|(entry, _)| entry.clone()))
    }

    async fn remove(&self, token_id: &str) -> Result<bool, SessionError> {
        let mut entries = self.entries.write().await;
        Ok(entries.remove(token_id).is_some())
    }
}

/// Redis-backed registry: the store enforces the TTL itself.
#[cfg(feature = "redis")]
pub struct RedisSessionRegistry {
    conn: redis::aio::ConnectionManager,
    prefix: String,
}

#[cfg(feature = "redis")]
impl RedisSessionRegistry {
    pub fn new(conn: redis::aio::ConnectionManager, prefix: impl Into<String>) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
        }
    }

    fn key(&self, token_id: &str) -> String {
        format!("{}:session:{}", self.prefix, token_id)
    }
}

#[cfg(feature = "redis")]
#[async_trait]
impl SessionRegistry for RedisSessionRegistry {
    async fn put(&self, entry: SessionEntry, ttl: Duration) -> Result<(), SessionError> {
        use redis::AsyncCommands;

        let payload = serde_json::to_string(&entry)
            .map_err(|e| SessionError::Corrupt(e.to_string()))?;
        let secs = ttl.num_seconds().max(1) as u64;
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(self.key(&entry.token_id), payload, secs)
            .await
            .map_err(|e| SessionError::Unavailable(e.to_string()))
    }

    async fn get(&self, token_id: &str) -> Result<Option<SessionEntry>, SessionError> {
        use redis::AsyncCommands;

        let mut conn = self.conn.clone();
        let payload: Option<String> = conn
            .get(self.key(token_id))
            .await
            .map_err(|e| SessionError::Unavailable(e.to_string()))?;
        payload
            .map(|p| serde_json::from_str(&p).map_err(|e| SessionError::Corrupt(e.to_string())))
            .transpose()
    }

    async fn remove(&self, token_id: &str) -> Result<bool, SessionError> {
        use redis::AsyncCommands;

        let mut conn = self.conn.clone();
        let removed: u64 = conn
            .del(self.key(token_id))
            .await
            .map_err(|e| SessionError::Unavailable(e.to_string()))?;
        Ok(removed > 0)
    }
}
