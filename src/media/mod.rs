// ============================================================================
// Media Service
// ============================================================================
//
// Upload records and the blob storage boundary. Consumes `post.deleted` to
// cascade removal of the deleted post's media, then announces the removal as
// `media.deleted` for services holding derived views.
//
// ============================================================================

pub mod blob;
pub mod consumer;
pub mod handlers;
pub mod store;

use crate::bus::EventBus;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use self::blob::BlobStore;
use ripple_config::MediaConfig;
use sqlx::PgPool;
use std::sync::Arc;

pub struct MediaState {
    pub pool: PgPool,
    pub blob_store: Arc<dyn BlobStore>,
    pub bus: Arc<EventBus>,
    pub config: MediaConfig,
}

pub fn router(state: Arc<MediaState>) -> Router {
    let max_upload = state.config.max_upload_bytes;
    Router::new()
        .route(
            "/api/media/upload",
            post(handlers::upload_media).layer(DefaultBodyLimit::max(max_upload)),
        )
        .route("/api/media", get(handlers::get_all_media))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
