//! Refresh token sessions stored in Redis
//!
//! Every refresh token issued by the service has a session entry keyed by the
//! token id (`jti`). A refresh token is only honoured while its session
//! exists, so deleting the entry revokes the token.

use anyhow::Result;
use common::{
    cache::RedisPool,
    jwt::{Claims, now_secs},
};
use tracing::info;

/// Session manager for handling refresh token sessions in Redis
#[derive(Clone)]
pub struct SessionManager {
    redis_pool: RedisPool,
}

fn session_key(claims: &Claims) -> String {
    format!("session:{}", claims.jti)
}

/// Seconds until the token described by `claims` expires
fn remaining_lifetime(claims: &Claims) -> Result<u64> {
    Ok(claims.exp.saturating_sub(now_secs()?))
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(redis_pool: RedisPool) -> Self {
        Self { redis_pool }
    }

    /// Record the session of a freshly issued refresh token
    pub async fn create_session(&self, claims: &Claims) -> Result<()> {
        info!("Creating session for user: {}", claims.sub);

        let ttl = remaining_lifetime(claims)?;
        self.redis_pool
            .set(&session_key(claims), &claims.sub.to_string(), Some(ttl))
            .await
    }

    /// Check that the refresh token described by `claims` was not revoked
    pub async fn is_session_valid(&self, claims: &Claims) -> Result<bool> {
        let owner = self.redis_pool.get(&session_key(claims)).await?;
        Ok(owner.is_some_and(|owner| owner == claims.sub.to_string()))
    }

    /// Revoke the refresh token described by `claims`
    ///
    /// Returns `false` when the session was already gone, which means another
    /// request revoked it first.
    pub async fn revoke_session(&self, claims: &Claims) -> Result<bool> {
        info!("Revoking session for user: {}", claims.sub);
        self.redis_pool.delete(&session_key(claims)).await
    }

    /// Get Redis health status
    pub async fn health_check(&self) -> Result<bool> {
        self.redis_pool.health_check().await
    }
}
