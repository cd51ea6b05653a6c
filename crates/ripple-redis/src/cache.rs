//! Keyed cache coordinator for expensive service queries.
//!
//! Keys live under a per-service namespace (`{namespace}:{key}`). Reads and
//! writes are best-effort: a cache failure degrades to recomputation, never to
//! a request failure. Invalidation returns its error so callers on the event
//! path can refuse acknowledgment and let the bus redeliver.

use crate::{RedisClient, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Clone)]
pub struct Cache {
    client: RedisClient,
    namespace: String,
    ttl_secs: u64,
}

impl Cache {
    pub fn new(client: RedisClient, namespace: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            ttl_secs,
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// Look up a cached value. Any store or decode failure is reported as a
    /// miss so the caller recomputes.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full_key = self.full_key(key);
        match self.client.get::<String>(&full_key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(key = %full_key, error = %e, "discarding undecodable cache entry");
                    let _ = self.client.del(&full_key).await;
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %full_key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Store a value under the configured TTL. Best-effort.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) {
        let full_key = self.full_key(key);
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key = %full_key, error = %e, "failed to serialize cache value");
                return;
            }
        };
        if let Err(e) = self.client.set_ex(&full_key, raw, self.ttl_secs).await {
            tracing::warn!(key = %full_key, error = %e, "cache write failed");
        }
    }

    /// Remove a single entry. Removing an absent key is a no-op, never an
    /// error, so redelivered invalidation events stay idempotent.
    pub async fn invalidate(&self, key: &str) -> Result<()> {
        let full_key = self.full_key(key);
        let removed = self.client.del(&full_key).await?;
        tracing::debug!(key = %full_key, removed, "cache entry invalidated");
        Ok(())
    }

    /// Sweep every entry under `{namespace}:{prefix}:`.
    ///
    /// Listing and pagination views are never invalidated individually; the
    /// whole prefix is treated as stale and removed wholesale.
    pub async fn invalidate_namespace(&self, prefix: &str) -> Result<u64> {
        let pattern = format!("{}:{}:*", self.namespace, prefix);
        let removed = self.client.del_matching(&pattern).await?;
        tracing::debug!(pattern = %pattern, removed, "cache namespace swept");
        Ok(removed)
    }
}
