// ============================================================================
// Admission control tests
// ============================================================================
//
// Properties verified against a real shared store, under real concurrency:
// - at most `ceiling` of N concurrent requests from one key are allowed
// - no request is allowed once the window is exhausted
// - a blocked key stays rejected for the full cooldown, even after its
//   rolling window has elapsed
//
// Requires Redis: docker run -d -p 6379:6379 redis:7
//
// ============================================================================

use ripple::limiter::{BurstLimiter, FixedWindowLimiter};
use ripple_config::{FixedWindowConfig, RateLimitConfig};
use ripple_redis::RedisClient;
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const REDIS_URL: &str = "redis://localhost:6379";

fn burst_config(points: u32, block_secs: u64) -> RateLimitConfig {
    RateLimitConfig {
        general: FixedWindowConfig { max: 100, window_secs: 900 },
        sensitive: FixedWindowConfig { max: 50, window_secs: 900 },
        burst_points: points,
        burst_window_secs: 1,
        burst_block_secs: block_secs,
    }
}

#[tokio::test]
#[serial]
#[ignore] // Requires Redis
async fn concurrent_requests_never_exceed_ceiling() {
    const CEILING: u32 = 100;
    const TOTAL: usize = 150;

    let client = RedisClient::connect(REDIS_URL).await.unwrap();
    let limiter = Arc::new(FixedWindowLimiter::new(
        client.clone(),
        "test_concurrent",
        FixedWindowConfig { max: CEILING, window_secs: 60 },
    ));
    let key = Uuid::new_v4().to_string();

    let mut tasks = Vec::with_capacity(TOTAL);
    for _ in 0..TOTAL {
        let limiter = limiter.clone();
        let key = key.clone();
        tasks.push(tokio::spawn(async move { limiter.check(&key).await }));
    }

    let mut allowed = 0usize;
    let mut rejected = 0usize;
    for task in tasks {
        if task.await.unwrap().is_allowed() {
            allowed += 1;
        } else {
            rejected += 1;
        }
    }

    // The atomic increment makes the split exact, not approximate.
    assert_eq!(allowed, CEILING as usize);
    assert_eq!(rejected, TOTAL - CEILING as usize);

    // The window is exhausted: no allow can follow the rejects.
    assert!(!limiter.check(&key).await.is_allowed());

    client
        .del(format!("ratelimit:test_concurrent:{}", key))
        .await
        .unwrap();
}

#[tokio::test]
#[serial]
#[ignore] // Requires Redis
async fn rejection_carries_retry_after() {
    let client = RedisClient::connect(REDIS_URL).await.unwrap();
    let limiter = FixedWindowLimiter::new(
        client.clone(),
        "test_retry_after",
        FixedWindowConfig { max: 1, window_secs: 60 },
    );
    let key = Uuid::new_v4().to_string();

    assert!(limiter.check(&key).await.is_allowed());
    let decision = limiter.check(&key).await;
    let retry_after = decision.retry_after_secs();
    assert!(retry_after > 0 && retry_after <= 60);

    client
        .del(format!("ratelimit:test_retry_after:{}", key))
        .await
        .unwrap();
}

#[tokio::test]
#[serial]
#[ignore] // Requires Redis
async fn blocked_key_stays_rejected_after_window_elapses() {
    let client = RedisClient::connect(REDIS_URL).await.unwrap();
    let limiter = BurstLimiter::new(client.clone(), "test_block", &burst_config(3, 4));
    let key = Uuid::new_v4().to_string();

    for _ in 0..3 {
        assert!(limiter.check(&key).await.is_allowed());
    }
    // Overflow places the key into the blocked state.
    assert!(!limiter.check(&key).await.is_allowed());

    // The one-second rolling window has long elapsed; the block must hold
    // regardless of the budget underneath.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let decision = limiter.check(&key).await;
    assert!(!decision.is_allowed());
    assert!(decision.retry_after_secs() <= 4);

    // Once the cooldown passes, the key admits again.
    tokio::time::sleep(Duration::from_millis(3000)).await;
    assert!(limiter.check(&key).await.is_allowed());

    client
        .del(format!("ratelimit:burst:test_block:{}", key))
        .await
        .unwrap();
    client
        .del(format!("ratelimit:block:test_block:{}", key))
        .await
        .unwrap();
}

#[tokio::test]
#[serial]
#[ignore] // Requires Redis
async fn blocked_requests_consume_no_budget() {
    let client = RedisClient::connect(REDIS_URL).await.unwrap();
    let limiter = BurstLimiter::new(client.clone(), "test_noconsume", &burst_config(2, 3));
    let key = Uuid::new_v4().to_string();

    assert!(limiter.check(&key).await.is_allowed());
    assert!(limiter.check(&key).await.is_allowed());
    assert!(!limiter.check(&key).await.is_allowed());

    // Hammering a blocked key must not recreate the budget counter.
    for _ in 0..5 {
        assert!(!limiter.check(&key).await.is_allowed());
    }
    let budget_exists = client
        .exists(&format!("ratelimit:burst:test_noconsume:{}", key))
        .await
        .unwrap();
    assert!(!budget_exists);

    client
        .del(format!("ratelimit:block:test_noconsume:{}", key))
        .await
        .unwrap();
}
