// ============================================================================
// Admission control
// ============================================================================
//
// Two independent policies, both backed by the shared Redis store so every
// gateway instance sees the same counters:
//
// - FixedWindowLimiter: per-key counter with a fixed window. Applied to
//   general traffic (and, with a tighter ceiling, to registration).
// - BurstLimiter: strict point budget over a short rolling window; overflow
//   places the key into an explicit blocked state for a cooldown during
//   which every request is rejected without consuming further budget.
//
// Counter increment and expiry run as one Lua script per check. A read-then-
// write sequence would let two concurrent requests both observe a sub-limit
// count and both pass.
//
// Store-unavailable policy: fixed-window checks fail open (allow, warn),
// burst checks fail closed (reject). See DESIGN.md.
//
// ============================================================================

use ripple_config::{FixedWindowConfig, RateLimitConfig};
use ripple_redis::RedisClient;
use std::time::Duration;

/// Admission decision for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Reject { retry_after: Duration },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Seconds the caller should wait before retrying; zero when allowed.
    pub fn retry_after_secs(&self) -> u64 {
        match self {
            Decision::Allow => 0,
            Decision::Reject { retry_after } => retry_after.as_secs(),
        }
    }
}

// INCR and first-hit EXPIRE as one atomic operation; returns the count and
// the key's remaining TTL.
const FIXED_WINDOW_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
  redis.call('EXPIRE', KEYS[1], ARGV[1])
end
local ttl = redis.call('TTL', KEYS[1])
return {count, ttl}
"#;

// Honors an existing block marker before touching the budget; overflow sets
// the marker and clears the window counter. Returns {-1, retry_after} when
// rejected, {count, ttl} otherwise.
const BURST_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[2]) == 1 then
  return {-1, redis.call('TTL', KEYS[2])}
end
local count = redis.call('INCR', KEYS[1])
if count == 1 then
  redis.call('EXPIRE', KEYS[1], ARGV[1])
end
if count > tonumber(ARGV[2]) then
  redis.call('SET', KEYS[2], 1, 'EX', ARGV[3])
  redis.call('DEL', KEYS[1])
  return {-1, tonumber(ARGV[3])}
end
return {count, redis.call('TTL', KEYS[1])}
"#;

/// Fixed-window counter limiter shared across all gateway instances.
pub struct FixedWindowLimiter {
    client: RedisClient,
    scope: String,
    max: u32,
    window_secs: u64,
    script: redis::Script,
}

impl FixedWindowLimiter {
    pub fn new(client: RedisClient, scope: impl Into<String>, config: FixedWindowConfig) -> Self {
        Self {
            client,
            scope: scope.into(),
            max: config.max,
            window_secs: config.window_secs,
            script: RedisClient::create_script(FIXED_WINDOW_SCRIPT),
        }
    }

    fn counter_key(&self, key: &str) -> String {
        format!("ratelimit:{}:{}", self.scope, key)
    }

    /// Check admission for `key`. Fails open: if the store is unreachable the
    /// request is allowed and a warning records the degradation, since
    /// availability of read traffic outranks perfect admission accuracy.
    pub async fn check(&self, key: &str) -> Decision {
        let counter_key = self.counter_key(key);
        let mut conn = self.client.connection();

        let result: Result<(i64, i64), _> = self
            .script
            .key(&counter_key)
            .arg(self.window_secs)
            .invoke_async(&mut conn)
            .await;

        match result {
            Ok((count, ttl)) => {
                if count > self.max as i64 {
                    let retry_after = if ttl > 0 { ttl as u64 } else { self.window_secs };
                    tracing::warn!(
                        scope = %self.scope,
                        key,
                        count,
                        limit = self.max,
                        retry_after_secs = retry_after,
                        "rate limit exceeded"
                    );
                    Decision::Reject {
                        retry_after: Duration::from_secs(retry_after),
                    }
                } else {
                    Decision::Allow
                }
            }
            Err(e) => {
                tracing::warn!(
                    scope = %self.scope,
                    key,
                    error = %e,
                    "rate limit store unavailable, failing open"
                );
                Decision::Allow
            }
        }
    }
}

/// Short-window budget limiter with an explicit blocked state, for sensitive
/// paths.
pub struct BurstLimiter {
    client: RedisClient,
    scope: String,
    points: u32,
    window_secs: u64,
    block_secs: u64,
    script: redis::Script,
}

impl BurstLimiter {
    pub fn new(client: RedisClient, scope: impl Into<String>, config: &RateLimitConfig) -> Self {
        Self {
            client,
            scope: scope.into(),
            points: config.burst_points,
            window_secs: config.burst_window_secs,
            block_secs: config.burst_block_secs,
            script: RedisClient::create_script(BURST_SCRIPT),
        }
    }

    fn budget_key(&self, key: &str) -> String {
        format!("ratelimit:burst:{}:{}", self.scope, key)
    }

    fn block_key(&self, key: &str) -> String {
        format!("ratelimit:block:{}:{}", self.scope, key)
    }

    /// Check admission for `key`. Fails closed: sensitive paths reject when
    /// the store cannot vouch for the budget.
    pub async fn check(&self, key: &str) -> Decision {
        let mut conn = self.client.connection();

        let result: Result<(i64, i64), _> = self
            .script
            .key(self.budget_key(key))
            .key(self.block_key(key))
            .arg(self.window_secs)
            .arg(self.points)
            .arg(self.block_secs)
            .invoke_async(&mut conn)
            .await;

        match result {
            Ok((-1, retry)) => {
                let retry_after = if retry > 0 { retry as u64 } else { self.block_secs };
                tracing::warn!(
                    scope = %self.scope,
                    key,
                    retry_after_secs = retry_after,
                    "burst budget exceeded, key blocked"
                );
                Decision::Reject {
                    retry_after: Duration::from_secs(retry_after),
                }
            }
            Ok(_) => Decision::Allow,
            Err(e) => {
                tracing::error!(
                    scope = %self.scope,
                    key,
                    error = %e,
                    "rate limit store unavailable, failing closed"
                );
                Decision::Reject {
                    retry_after: Duration::from_secs(self.window_secs),
                }
            }
        }
    }
}
