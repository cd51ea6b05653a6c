// ============================================================================
// Gateway Router
// ============================================================================
//
// Routes requests to the owning service based on path prefix:
// - /v1/auth/*  → identity-service
// - /v1/posts/* → post-service
// - /v1/media/* → media-service
//
// The public surface speaks /v1; upstream services speak /api. The rewrite is
// applied before forwarding.
//
// ============================================================================

use crate::gateway::service_client::ServiceClient;
use axum::{
    body::Body,
    extract::{Request, State},
    response::Response,
};
use ripple_config::GatewayConfig;
use ripple_error::AppError;
use std::sync::Arc;

/// Version marker exposed to clients.
const PUBLIC_PREFIX: &str = "/v1";
/// Version marker spoken by internal services.
const INTERNAL_PREFIX: &str = "/api";

/// A single static routing rule, loaded once at startup.
#[derive(Debug, Clone)]
pub struct RoutingRule {
    pub prefix: &'static str,
    pub service: &'static str,
    pub upstream: String,
}

/// Build the routing table from configuration.
pub fn routing_table(config: &GatewayConfig) -> Vec<RoutingRule> {
    vec![
        RoutingRule {
            prefix: "/v1/auth",
            service: "identity",
            upstream: config.identity_service_url.clone(),
        },
        RoutingRule {
            prefix: "/v1/posts",
            service: "posts",
            upstream: config.post_service_url.clone(),
        },
        RoutingRule {
            prefix: "/v1/media",
            service: "media",
            upstream: config.media_service_url.clone(),
        },
    ]
}

/// Rewrite the public version marker to the internal one.
///
/// `/v1/auth/login` becomes `/api/auth/login`; a path without the public
/// marker is forwarded untouched.
pub fn rewrite_path(path: &str) -> String {
    match path.strip_prefix(PUBLIC_PREFIX) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => {
            format!("{}{}", INTERNAL_PREFIX, rest)
        }
        _ => path.to_string(),
    }
}

/// Gateway router state
pub struct GatewayState {
    pub rules: Vec<RoutingRule>,
    pub service_client: ServiceClient,
}

/// Forward a request to the service owning its path prefix.
pub async fn route_request(
    State(state): State<Arc<GatewayState>>,
    request: Request<Body>,
) -> Result<Response<Body>, AppError> {
    let path = request.uri().path().to_string();

    let rule = state
        .rules
        .iter()
        .find(|rule| is_prefix_match(&path, rule.prefix))
        .ok_or_else(|| AppError::NotFound("route".to_string()))?;

    let target_path = rewrite_path(&path);

    match state
        .service_client
        .forward(&rule.upstream, &target_path, request)
        .await
    {
        Ok(response) => Ok(response),
        Err(e) => {
            tracing::error!(
                service = rule.service,
                upstream = %rule.upstream,
                path = %path,
                error = %e,
                "failed to forward request to service"
            );
            Err(e)
        }
    }
}

/// Prefix match on whole path segments, so `/v1/postsfeed` does not match the
/// `/v1/posts` rule.
fn is_prefix_match(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_table() -> Vec<RoutingRule> {
        routing_table(&GatewayConfig {
            identity_service_url: "http://identity:3001".to_string(),
            post_service_url: "http://posts:3002".to_string(),
            media_service_url: "http://media:3003".to_string(),
            service_timeout_secs: 5,
        })
    }

    #[test]
    fn rewrites_version_prefix() {
        assert_eq!(rewrite_path("/v1/auth/login"), "/api/auth/login");
        assert_eq!(rewrite_path("/v1/posts"), "/api/posts");
        assert_eq!(
            rewrite_path("/v1/media/upload"),
            "/api/media/upload"
        );
    }

    #[test]
    fn leaves_unversioned_paths_alone() {
        assert_eq!(rewrite_path("/health"), "/health");
        assert_eq!(rewrite_path("/api/auth/login"), "/api/auth/login");
        // A marker that only *starts* like the public one is not rewritten
        assert_eq!(rewrite_path("/v10/auth"), "/v10/auth");
    }

    #[test]
    fn matches_rule_by_prefix_segment() {
        let rules = test_table();
        let rule = rules
            .iter()
            .find(|r| is_prefix_match("/v1/posts/42", r.prefix))
            .unwrap();
        assert_eq!(rule.service, "posts");

        assert!(rules
            .iter()
            .find(|r| is_prefix_match("/v1/postsfeed", r.prefix))
            .is_none());
        assert!(rules
            .iter()
            .find(|r| is_prefix_match("/v2/posts", r.prefix))
            .is_none());
    }

    #[test]
    fn auth_routes_go_to_identity() {
        let rules = test_table();
        let rule = rules
            .iter()
            .find(|r| is_prefix_match("/v1/auth/register", r.prefix))
            .unwrap();
        assert_eq!(rule.upstream, "http://identity:3001");
    }
}
