// ============================================================================
// Post Service
// ============================================================================
//
// Post CRUD with a shared keyed cache over the read path. Publishes
// post.created / post.deleted; consumes media.deleted to sweep its listing
// cache when media disappears elsewhere.
//
// ============================================================================

use anyhow::{Context, Result};
use ripple::bus::{events, spawn_consumer, EventBus};
use ripple::posts::{self, consumer::PostCacheInvalidator, PostState};
use ripple_config::Config;
use ripple_redis::{Cache, RedisClient};
use sqlx::postgres::PgPoolOptions;
use std::future::IntoFuture;
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

    info!("=== Post Service starting ===");
    info!("Port: {}", config.port);

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("failed to connect to the database")?;
    posts::store::init_schema(&pool)
        .await
        .context("failed to initialize the posts schema")?;

    let redis = RedisClient::connect(&config.redis_url)
        .await
        .context("failed to connect to the cache store")?;
    let cache = Cache::new(redis, "posts", config.cache.ttl_secs);

    let bus = Arc::new(EventBus::new(&config.bus));
    bus.ensure_connected()
        .await
        .context("failed to connect to the event bus")?;

    // Remote-origin invalidation: media removed elsewhere → listing sweep here.
    let invalidator = Arc::new(PostCacheInvalidator::new(cache.clone()));
    let consumer = spawn_consumer(config.bus.clone(), events::MEDIA_DELETED, invalidator);

    let state = Arc::new(PostState { pool, cache, bus });
    let app = posts::router(state);

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .context("invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Post Service listening on {}", addr);

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .into_future();

    // The consumer loop reconnects forever; it resolving at all means the
    // task died. Treat that as fatal so the supervisor restarts the process.
    tokio::select! {
        result = server => {
            result.context("post service error")?;
        }
        result = consumer => {
            anyhow::bail!("event consumer terminated unexpectedly: {:?}", result);
        }
    }

    Ok(())
}
