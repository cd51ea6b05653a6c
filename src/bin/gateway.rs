// ============================================================================
// API Gateway
// ============================================================================
//
// Single entry point for all client requests:
// - distributed admission control (shared fixed-window limiter)
// - bearer-token verification with trusted identity propagation
// - path rewrite and dispatch to the owning service
//
// Stateless; scales horizontally.
//
// ============================================================================

use anyhow::{Context, Result};
use axum::{middleware, routing::get, Json, Router};
use ripple::auth::AuthManager;
use ripple::gateway::middleware::{admission, authentication, GatewayMiddlewareState};
use ripple::gateway::{route_request, routing_table, GatewayState, ServiceClient};
use ripple::limiter::FixedWindowLimiter;
use ripple_config::Config;
use ripple_redis::RedisClient;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Arc::new(Config::from_env()?);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.rust_log.clone()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("=== API Gateway starting ===");
    info!("Port: {}", config.port);
    info!("Identity service: {}", config.gateway.identity_service_url);
    info!("Post service: {}", config.gateway.post_service_url);
    info!("Media service: {}", config.gateway.media_service_url);

    // The shared store is load-bearing for admission control; failing to
    // reach it at boot is fatal so the supervisor restarts us.
    let redis = RedisClient::connect(&config.redis_url)
        .await
        .context("failed to connect to the rate-limit store")?;

    let auth_manager = Arc::new(AuthManager::new(&config)?);

    let middleware_state = Arc::new(GatewayMiddlewareState {
        auth_manager,
        general_limiter: FixedWindowLimiter::new(redis, "gw", config.limits.general),
    });

    let gateway_state = Arc::new(GatewayState {
        rules: routing_table(&config.gateway),
        service_client: ServiceClient::new(config.gateway.service_timeout_secs),
    });

    let app = Router::new()
        .route("/health", get(health_check))
        .fallback(route_request)
        // Layer order: trace wraps admission wraps authentication.
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn_with_state(
                    middleware_state.clone(),
                    admission,
                ))
                .layer(middleware::from_fn_with_state(
                    middleware_state,
                    authentication,
                ))
                .into_inner(),
        )
        .with_state(gateway_state);

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .context("invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("API Gateway listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("gateway server error")?;

    Ok(())
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
