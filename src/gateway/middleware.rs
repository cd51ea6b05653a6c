// ============================================================================
// Gateway Middleware
// ============================================================================
//
// - admission: distributed fixed-window rate limiting keyed by client IP
// - authentication: bearer-token verification on protected routes, with
//   trusted identity headers propagated to upstream services
//
// ============================================================================

use crate::auth::{bearer_token, AuthManager, HEADER_USER_ID, HEADER_USER_ROLE};
use crate::limiter::{Decision, FixedWindowLimiter};
use crate::utils::extract_client_ip;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::AUTHORIZATION, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use ripple_error::AppError;
use std::net::SocketAddr;
use std::sync::Arc;

/// Shared state for the gateway middleware stack
pub struct GatewayMiddlewareState {
    pub auth_manager: Arc<AuthManager>,
    pub general_limiter: FixedWindowLimiter,
}

/// Admission control middleware.
///
/// Every request consumes one unit of the client's fixed-window budget before
/// any other work happens. The budget lives in the shared store, so all
/// gateway instances enforce one combined ceiling per client.
pub async fn admission(
    State(state): State<Arc<GatewayMiddlewareState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client_key = extract_client_ip(request.headers(), Some(addr.ip()));

    tracing::info!(
        method = %request.method(),
        path = %request.uri().path(),
        client = %client_key,
        "gateway request"
    );

    match state.general_limiter.check(&client_key).await {
        Decision::Allow => Ok(next.run(request).await),
        decision @ Decision::Reject { .. } => Err(AppError::TooManyRequests {
            retry_after_secs: decision.retry_after_secs(),
        }),
    }
}

/// Credential verification middleware.
///
/// Public routes pass through with any inbound identity headers stripped;
/// protected routes require a valid bearer token, whose claims are then
/// propagated as trusted headers for the owning service.
pub async fn authentication(
    State(state): State<Arc<GatewayMiddlewareState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path().to_string();

    // Always strip inbound identity headers so they can only ever originate
    // from this gateway.
    request.headers_mut().remove(HEADER_USER_ID);
    request.headers_mut().remove(HEADER_USER_ROLE);

    if is_public_endpoint(&path) {
        return Ok(next.run(request).await);
    }

    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!(path = %path, "missing Authorization header");
            AppError::auth("no token provided")
        })?;

    let token = bearer_token(auth_header).ok_or_else(|| {
        tracing::warn!(path = %path, "malformed Authorization header");
        AppError::auth("malformed authorization header")
    })?;

    let claims = state.auth_manager.verify_token(token)?;

    if let Ok(value) = HeaderValue::from_str(&claims.sub) {
        request
            .headers_mut()
            .insert(HeaderName::from_static(HEADER_USER_ID), value);
    }
    if let Ok(value) = HeaderValue::from_str(&claims.role) {
        request
            .headers_mut()
            .insert(HeaderName::from_static(HEADER_USER_ROLE), value);
    }

    Ok(next.run(request).await)
}

/// Check if endpoint is public (doesn't require authentication)
fn is_public_endpoint(path: &str) -> bool {
    path.starts_with("/v1/auth") || path == "/health"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_routes_are_public() {
        assert!(is_public_endpoint("/v1/auth/register"));
        assert!(is_public_endpoint("/v1/auth/login"));
        assert!(is_public_endpoint("/health"));
    }

    #[test]
    fn content_routes_are_protected() {
        assert!(!is_public_endpoint("/v1/posts"));
        assert!(!is_public_endpoint("/v1/posts/42"));
        assert!(!is_public_endpoint("/v1/media/upload"));
    }
}
