// ============================================================================
// Identity Service
// ============================================================================
//
// Registration and login. Every route sits behind the burst limiter (strict
// one-second budget with a cooldown block on overflow); registration
// additionally carries a tighter fixed-window ceiling. Issues HS256 access
// tokens verified self-contained by the gateway.
//
// ============================================================================

pub mod handlers;
pub mod store;
pub mod validation;

use crate::auth::AuthManager;
use crate::limiter::{BurstLimiter, Decision, FixedWindowLimiter};
use crate::utils::extract_client_ip;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use ripple_error::AppError;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;

pub struct IdentityState {
    pub pool: PgPool,
    pub auth_manager: Arc<AuthManager>,
    pub burst_limiter: BurstLimiter,
    pub register_limiter: FixedWindowLimiter,
}

pub fn router(state: Arc<IdentityState>) -> Router {
    Router::new()
        .route(
            "/api/auth/register",
            post(handlers::register).route_layer(middleware::from_fn_with_state(
                state.clone(),
                register_admission,
            )),
        )
        .route("/api/auth/login", post(handlers::login))
        .route("/health", get(health))
        .layer(middleware::from_fn_with_state(state.clone(), burst_admission))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Burst protection on every identity route. Fails closed when the store is
/// unavailable (see limiter module).
async fn burst_admission(
    State(state): State<Arc<IdentityState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client_key = extract_client_ip(request.headers(), Some(addr.ip()));
    match state.burst_limiter.check(&client_key).await {
        Decision::Allow => Ok(next.run(request).await),
        decision => Err(AppError::TooManyRequests {
            retry_after_secs: decision.retry_after_secs(),
        }),
    }
}

/// Tighter fixed-window ceiling on registration.
async fn register_admission(
    State(state): State<Arc<IdentityState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client_key = extract_client_ip(request.headers(), Some(addr.ip()));
    match state.register_limiter.check(&client_key).await {
        Decision::Allow => Ok(next.run(request).await),
        decision => Err(AppError::TooManyRequests {
            retry_after_secs: decision.retry_after_secs(),
        }),
    }
}
