// ============================================================================
// Service Client
// ============================================================================
//
// HTTP client for forwarding gateway requests to internal services. Propagates
// upstream status and body unchanged on success; converts connect, timeout and
// protocol failures into a uniform Bad Gateway. Never retries: blind gateway
// retries amplify load on an upstream that is already struggling.
//
// ============================================================================

use axum::body::Body;
use axum::http::{Request, Response};
use ripple_error::AppError;
use std::time::Duration;

/// HTTP client for forwarding requests to internal services
pub struct ServiceClient {
    client: reqwest::Client,
}

impl ServiceClient {
    pub fn new(timeout_secs: u64) -> Self {
        // Connection pooling and keep-alive; the per-request timeout bounds
        // how long a hung upstream can hold one request.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .tcp_keepalive(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Forward `request` to `upstream`, substituting `target_path` for the
    /// original (already rewritten by the router).
    pub async fn forward(
        &self,
        upstream: &str,
        target_path: &str,
        request: Request<Body>,
    ) -> Result<Response<Body>, AppError> {
        let target_url = match request.uri().query() {
            Some(query) => format!("{}{}?{}", upstream, target_path, query),
            None => format!("{}{}", upstream, target_path),
        };

        let method = request.method().clone();
        let headers = request.headers().clone();

        let (_parts, body) = request.into_parts();
        let body_bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|e| AppError::internal(format!("failed to read request body: {}", e)))?;

        let mut upstream_request = self.client.request(method, &target_url);

        // Host is set by the client from the target URL
        for (key, value) in headers.iter() {
            if key != "host" {
                upstream_request = upstream_request.header(key, value);
            }
        }

        if !body_bytes.is_empty() {
            upstream_request = upstream_request.body(body_bytes.to_vec());
        }

        let upstream_response = upstream_request
            .send()
            .await
            .map_err(|e| AppError::upstream(e.to_string()))?;

        let status = upstream_response.status();
        let mut response = Response::builder().status(status);
        for (key, value) in upstream_response.headers().iter() {
            response = response.header(key, value);
        }

        let response_bytes = upstream_response
            .bytes()
            .await
            .map_err(|e| AppError::upstream(format!("failed to read upstream body: {}", e)))?;

        response
            .body(Body::from(response_bytes.to_vec()))
            .map_err(|e| AppError::internal(format!("failed to build response: {}", e)))
    }
}
