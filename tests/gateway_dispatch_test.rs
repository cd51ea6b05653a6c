// ============================================================================
// Gateway dispatch tests
// ============================================================================
//
// Exercise the routing + forwarding path against local upstreams only, so
// these run without external infrastructure:
// - version-prefix rewrite end to end
// - upstream status/body propagation
// - unreachable upstream → Bad Gateway while the gateway stays responsive
//
// ============================================================================

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use ripple::gateway::{route_request, GatewayState, RoutingRule, ServiceClient};
use ripple_error::AppError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Spin up a stub upstream service on an ephemeral port.
async fn spawn_upstream(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn identity_stub() -> Router {
    Router::new().route(
        "/api/auth/login",
        post(|body: String| async move {
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "success": true,
                    "echo": body,
                })),
            )
                .into_response()
        }),
    )
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn forwards_with_rewritten_path_and_propagates_response() {
    let upstream = spawn_upstream(identity_stub()).await;

    let state = Arc::new(GatewayState {
        rules: vec![RoutingRule {
            prefix: "/v1/auth",
            service: "identity",
            upstream: format!("http://{}", upstream),
        }],
        service_client: ServiceClient::new(2),
    });
    let gateway = Router::new().fallback(route_request).with_state(state);

    let request = Request::builder()
        .method("POST")
        .uri("/v1/auth/login")
        .header("content-type", "text/plain")
        .body(Body::from("hello"))
        .unwrap();

    let response = gateway.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    // The upstream saw the request body unchanged, on the rewritten path.
    assert_eq!(json["echo"], "hello");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let state = Arc::new(GatewayState {
        rules: vec![],
        service_client: ServiceClient::new(2),
    });
    let gateway = Router::new().fallback(route_request).with_state(state);

    let request = Request::builder()
        .uri("/v1/unknown/thing")
        .body(Body::empty())
        .unwrap();
    let response = gateway.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn unreachable_upstream_yields_bad_gateway_and_gateway_stays_responsive() {
    let live_upstream = spawn_upstream(
        Router::new().route("/api/posts", get(|| async { Json(serde_json::json!({"success": true})) })),
    )
    .await;

    let state = Arc::new(GatewayState {
        rules: vec![
            RoutingRule {
                prefix: "/v1/auth",
                service: "identity",
                // Nothing listens here; connection is refused immediately.
                upstream: "http://127.0.0.1:9".to_string(),
            },
            RoutingRule {
                prefix: "/v1/posts",
                service: "posts",
                upstream: format!("http://{}", live_upstream),
            },
        ],
        service_client: ServiceClient::new(2),
    });
    let gateway = Router::new().fallback(route_request).with_state(state);

    // Failure must surface within the configured timeout, as a 502 with the
    // uniform error shape.
    let request = Request::builder()
        .uri("/v1/auth/login")
        .method("POST")
        .body(Body::empty())
        .unwrap();
    let response = tokio::time::timeout(Duration::from_secs(3), gateway.clone().oneshot(request))
        .await
        .expect("dispatch did not fail within the timeout")
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert!(json["error"].is_string(), "502 body carries the error detail");

    // Other routes keep working.
    let request = Request::builder()
        .uri("/v1/posts")
        .body(Body::empty())
        .unwrap();
    let response = gateway.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn forward_preserves_upstream_error_status() {
    let upstream = spawn_upstream(Router::new().route(
        "/api/posts/:id",
        get(|| async {
            (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"success": false, "message": "Post not found"})),
            )
        }),
    ))
    .await;

    let client = ServiceClient::new(2);
    let request = Request::builder()
        .uri("/v1/posts/42")
        .body(Body::empty())
        .unwrap();

    let response = client
        .forward(&format!("http://{}", upstream), "/api/posts/42", request)
        .await
        .unwrap();

    // 4xx from the upstream is passed through, not converted to 502.
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn forward_error_is_upstream_variant() {
    let client = ServiceClient::new(1);
    let request = Request::builder()
        .uri("/v1/auth/login")
        .body(Body::empty())
        .unwrap();

    let err = client
        .forward("http://127.0.0.1:9", "/api/auth/login", request)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Upstream(_)));
}
