// ============================================================================
// Post handlers
// ============================================================================
//
// Endpoints:
// - POST   /api/posts      - create post
// - GET    /api/posts      - paginated listing (cached)
// - GET    /api/posts/:id  - single post (cached)
// - DELETE /api/posts/:id  - delete own post
//
// ============================================================================

use crate::auth::AuthenticatedUser;
use crate::bus::Event;
use crate::posts::{store, PostState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use ripple_error::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

const MAX_CONTENT_CHARS: usize = 5000;
const MAX_PAGE_SIZE: u32 = 50;

/// Cache sub-namespace for paginated listings; swept wholesale on every write.
pub const LIST_NAMESPACE: &str = "list";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub content: String,
    #[serde(default)]
    pub media_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListResponse {
    pub success: bool,
    pub posts: Vec<store::Post>,
    pub page: u32,
    pub limit: u32,
    pub total: i64,
}

pub fn list_cache_key(page: u32, limit: u32) -> String {
    format!("{}:{}:{}", LIST_NAMESPACE, page, limit)
}

pub fn item_cache_key(id: Uuid) -> String {
    format!("item:{}", id)
}

/// POST /api/posts
pub async fn create_post(
    State(state): State<Arc<PostState>>,
    user: AuthenticatedUser,
    Json(request): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let content = request.content.trim();
    if content.is_empty() {
        return Err(AppError::validation("content is required"));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(AppError::validation(format!(
            "content must be at most {} characters",
            MAX_CONTENT_CHARS
        )));
    }

    let post = store::insert_post(&state.pool, user.user_id, content, &request.media_ids).await?;

    tracing::info!(post_id = %post.id, user_id = %user.user_id, "post created");

    // Every cached listing page may now be stale.
    if let Err(e) = state.cache.invalidate_namespace(LIST_NAMESPACE).await {
        tracing::warn!(error = %e, "listing cache sweep failed after create");
    }

    state.bus.publish_background(Event::post_created(
        post.id,
        post.user_id,
        post.media_ids.clone(),
    ));

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": "Post created successfully",
            "post": post,
        })),
    ))
}

/// GET /api/posts?page=&limit=
pub async fn get_posts(
    State(state): State<Arc<PostState>>,
    Query(pagination): Query<Pagination>,
) -> Result<impl IntoResponse, AppError> {
    let page = pagination.page.unwrap_or(1).max(1);
    let limit = pagination.limit.unwrap_or(10).clamp(1, MAX_PAGE_SIZE);

    let cache_key = list_cache_key(page, limit);
    if let Some(cached) = state.cache.get::<PostListResponse>(&cache_key).await {
        tracing::debug!(page, limit, "post listing served from cache");
        return Ok(Json(cached));
    }

    let (posts, total) = store::list_posts(&state.pool, page, limit).await?;
    let response = PostListResponse {
        success: true,
        posts,
        page,
        limit,
        total,
    };

    state.cache.set(&cache_key, &response).await;

    Ok(Json(response))
}

/// GET /api/posts/:id
pub async fn get_post(
    State(state): State<Arc<PostState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let cache_key = item_cache_key(id);
    if let Some(cached) = state.cache.get::<store::Post>(&cache_key).await {
        tracing::debug!(post_id = %id, "post served from cache");
        return Ok(Json(serde_json::json!({"success": true, "post": cached})));
    }

    let post = store::get_post(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post".to_string()))?;

    state.cache.set(&cache_key, &post).await;

    Ok(Json(serde_json::json!({"success": true, "post": post})))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    pub content: String,
}

/// PUT /api/posts/:id
pub async fn update_post(
    State(state): State<Arc<PostState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let content = request.content.trim();
    if content.is_empty() {
        return Err(AppError::validation("content is required"));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(AppError::validation(format!(
            "content must be at most {} characters",
            MAX_CONTENT_CHARS
        )));
    }

    let post = store::get_post(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post".to_string()))?;

    if post.user_id != user.user_id {
        tracing::warn!(post_id = %id, user_id = %user.user_id, "update of foreign post refused");
        return Err(AppError::Forbidden(
            "Not authorized to update this post".to_string(),
        ));
    }

    let post = store::update_post(&state.pool, id, content)
        .await?
        .ok_or_else(|| AppError::NotFound("Post".to_string()))?;

    tracing::info!(post_id = %id, "post updated");

    if let Err(e) = state.cache.invalidate(&item_cache_key(id)).await {
        tracing::warn!(error = %e, "item cache invalidation failed after update");
    }
    if let Err(e) = state.cache.invalidate_namespace(LIST_NAMESPACE).await {
        tracing::warn!(error = %e, "listing cache sweep failed after update");
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Post updated successfully",
        "post": post,
    })))
}

/// DELETE /api/posts/:id
pub async fn delete_post(
    State(state): State<Arc<PostState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let post = store::get_post(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post".to_string()))?;

    if post.user_id != user.user_id {
        tracing::warn!(post_id = %id, user_id = %user.user_id, "delete of foreign post refused");
        return Err(AppError::Forbidden(
            "Not authorized to delete this post".to_string(),
        ));
    }

    store::delete_post(&state.pool, id).await?;

    tracing::info!(post_id = %id, user_id = %user.user_id, "post deleted");

    if let Err(e) = state.cache.invalidate(&item_cache_key(id)).await {
        tracing::warn!(error = %e, "item cache invalidation failed after delete");
    }
    if let Err(e) = state.cache.invalidate_namespace(LIST_NAMESPACE).await {
        tracing::warn!(error = %e, "listing cache sweep failed after delete");
    }

    // Downstream owners of derived state (media service) cascade from this.
    state.bus.publish_background(Event::post_deleted(
        post.id,
        post.user_id,
        post.media_ids.clone(),
    ));

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Post deleted successfully",
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_keys_are_deterministic() {
        assert_eq!(list_cache_key(1, 10), "list:1:10");
        assert_eq!(list_cache_key(3, 25), "list:3:25");
        let id = Uuid::new_v4();
        assert_eq!(item_cache_key(id), format!("item:{}", id));
    }

    #[test]
    fn listing_keys_live_under_the_swept_namespace() {
        // invalidate_namespace(LIST_NAMESPACE) matches "{ns}:list:*"; every
        // listing key must start with "list:" for the sweep to reach it.
        assert!(list_cache_key(7, 42).starts_with("list:"));
        assert!(!item_cache_key(Uuid::new_v4()).starts_with("list:"));
    }
}
