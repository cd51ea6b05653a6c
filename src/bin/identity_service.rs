// ============================================================================
// Identity Service
// ============================================================================
//
// Registration and login behind burst protection. Issues the HS256 tokens the
// gateway verifies self-contained.
//
// ============================================================================

use anyhow::{Context, Result};
use ripple::auth::AuthManager;
use ripple::identity::{self, IdentityState};
use ripple::limiter::{BurstLimiter, FixedWindowLimiter};
use ripple_config::Config;
use ripple_redis::RedisClient;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.rust_log.clone()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("=== Identity Service starting ===");
    info!("Port: {}", config.port);

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("failed to connect to the database")?;
    identity::store::init_schema(&pool)
        .await
        .context("failed to initialize the users schema")?;

    let redis = RedisClient::connect(&config.redis_url)
        .await
        .context("failed to connect to the rate-limit store")?;

    let state = Arc::new(IdentityState {
        pool,
        auth_manager: Arc::new(AuthManager::new(&config)?),
        burst_limiter: BurstLimiter::new(redis.clone(), "identity", &config.limits),
        register_limiter: FixedWindowLimiter::new(redis, "register", config.limits.sensitive),
    });

    let app = identity::router(state);

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .context("invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Identity Service listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("identity service error")?;

    Ok(())
}
