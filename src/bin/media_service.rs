// ============================================================================
// Media Service
// ============================================================================
//
// Upload records over the blob storage boundary. Consumes post.deleted to
// cascade removal of the deleted post's media and announces media.deleted in
// turn.
//
// ============================================================================

use anyhow::{Context, Result};
use ripple::bus::{events, spawn_consumer, EventBus};
use ripple::media::{self, blob::FsBlobStore, consumer::MediaCleanupHandler, MediaState};
use ripple_config::Config;
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

    info!("=== Media Service starting ===");
    info!("Port: {}", config.port);
    info!("Storage root: {}", config.media.storage_root);

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("failed to connect to the database")?;
    media::store::init_schema(&pool)
        .await
        .context("failed to initialize the media schema")?;

    let blob_store = Arc::new(FsBlobStore::new(
        config.media.storage_root.clone(),
        config.media.public_base_url.clone(),
    ));

    let bus = Arc::new(EventBus::new(&config.bus));
    bus.ensure_connected()
        .await
        .context("failed to connect to the event bus")?;

    // Deletion cascade: post removed in the post service → its media goes here.
    let cleanup = Arc::new(MediaCleanupHandler::new(
        pool.clone(),
        blob_store.clone(),
        bus.clone(),
    ));
    let consumer = spawn_consumer(config.bus.clone(), events::POST_DELETED, cleanup);

    let state = Arc::new(MediaState {
        pool,
        blob_store,
        bus,
        config: config.media.clone(),
    });
    let app = media::router(state);

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .context("invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Media Service listening on {}", addr);

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .into_future();

    tokio::select! {
        result = server => {
            result.context("media service error")?;
        }
        result = consumer => {
            anyhow::bail!("event consumer terminated unexpectedly: {:?}", result);
        }
    }

    Ok(())
}
