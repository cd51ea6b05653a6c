// ============================================================================
// Post Service
// ============================================================================
//
// Post CRUD with a keyed cache in front of the expensive read queries.
// Local mutations invalidate the touched entry plus the whole listing
// namespace; `media.deleted` events from the media service trigger the same
// listing sweep remotely. Mutations announce themselves on the bus.
//
// ============================================================================

pub mod consumer;
pub mod handlers;
pub mod store;

use crate::bus::EventBus;
use axum::{
    routing::{get, post},
    Json, Router,
};
use ripple_redis::Cache;
use sqlx::PgPool;
use std::sync::Arc;

pub struct PostState {
    pub pool: PgPool,
    pub cache: Cache,
    pub bus: Arc<EventBus>,
}

pub fn router(state: Arc<PostState>) -> Router {
    Router::new()
        .route("/api/posts", post(handlers::create_post).get(handlers::get_posts))
        .route(
            "/api/posts/:id",
            get(handlers::get_post)
                .put(handlers::update_post)
                .delete(handlers::delete_post),
        )
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
