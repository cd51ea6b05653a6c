//! Redis client implementation with connection management

use crate::Result;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Redis client with automatic reconnection.
///
/// `ConnectionManager` multiplexes over a single connection and is cheap to
/// clone; every operation clones the handle so callers can share one
/// `RedisClient` across tasks without locking.
#[derive(Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
}

impl RedisClient {
    /// Connect to Redis server
    ///
    /// Supports both redis:// and rediss:// (TLS) URLs
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    /// Clone the underlying connection handle (for Lua script invocation)
    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }

    /// GET - Get value by key
    pub async fn get<T: redis::FromRedisValue>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.conn.clone();
        conn.get(key).await
    }

    /// SETEX - Set key with expiry in seconds
    pub async fn set_ex<V>(&self, key: &str, value: V, seconds: u64) -> Result<()>
    where
        V: redis::ToRedisArgs + Send + Sync,
    {
        let mut conn = self.conn.clone();
        conn.set_ex(key, value, seconds).await
    }

    /// DEL - Delete one or more keys, returning how many existed
    pub async fn del<K>(&self, keys: K) -> Result<i64>
    where
        K: redis::ToRedisArgs + Send + Sync,
    {
        let mut conn = self.conn.clone();
        conn.del(keys).await
    }

    /// EXISTS - Check if key exists
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        conn.exists(key).await
    }

    /// TTL - Get time to live in seconds
    pub async fn ttl(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        conn.ttl(key).await
    }

    /// INCR - Increment integer value
    pub async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        conn.incr(key, 1).await
    }

    /// PING - round-trip health probe
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async(&mut conn).await
    }

    /// Delete every key matching `pattern` via a cursor-based SCAN sweep.
    ///
    /// Returns the number of keys removed. SCAN is used instead of KEYS so the
    /// sweep never blocks the store under large keyspaces.
    pub async fn del_matching(&self, pattern: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;
            if !keys.is_empty() {
                let removed: i64 = conn.del(&keys).await?;
                deleted += removed as u64;
            }
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        Ok(deleted)
    }

    /// Build a Lua script handle
    ///
    /// Note: For complex scripts, consider using redis::Script directly
    pub fn create_script(code: &str) -> redis::Script {
        redis::Script::new(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: These tests require a running Redis instance
    // Run with: docker run -d -p 6379:6379 redis:7

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_basic_operations() -> Result<()> {
        let client = RedisClient::connect("redis://localhost:6379").await?;

        client.set_ex("ripple_test_key", "test_value", 30).await?;
        let value: Option<String> = client.get("ripple_test_key").await?;
        assert_eq!(value, Some("test_value".to_string()));

        client.del("ripple_test_key").await?;
        let value: Option<String> = client.get("ripple_test_key").await?;
        assert_eq!(value, None);

        Ok(())
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_del_matching_sweeps_namespace() -> Result<()> {
        let client = RedisClient::connect("redis://localhost:6379").await?;

        client.set_ex("ripple_sweep:list:1:10", "a", 30).await?;
        client.set_ex("ripple_sweep:list:2:10", "b", 30).await?;
        client.set_ex("ripple_sweep:item:42", "c", 30).await?;

        let removed = client.del_matching("ripple_sweep:list:*").await?;
        assert_eq!(removed, 2);

        // The item key survives the listing sweep
        assert!(client.exists("ripple_sweep:item:42").await?);
        client.del("ripple_sweep:item:42").await?;

        Ok(())
    }
}
