// ============================================================================
// Media handlers
// ============================================================================
//
// Endpoints:
// - POST /api/media/upload - multipart single-file upload
// - GET  /api/media        - caller's media records
//
// ============================================================================

use crate::auth::AuthenticatedUser;
use crate::media::{store, MediaState};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use ripple_error::AppError;
use std::sync::Arc;

/// POST /api/media/upload
pub async fn upload_media(
    State(state): State<Arc<MediaState>>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let original_name = field.file_name().unwrap_or("upload").to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(format!("failed to read upload: {}", e)))?;
        file = Some((original_name, mime_type, data.to_vec()));
        break;
    }

    let (original_name, mime_type, data) =
        file.ok_or_else(|| AppError::validation("No file found, please try again"))?;

    if data.is_empty() {
        return Err(AppError::validation("No file found, please try again"));
    }
    if data.len() > state.config.max_upload_bytes {
        return Err(AppError::validation(format!(
            "file exceeds the {} byte upload limit",
            state.config.max_upload_bytes
        )));
    }

    tracing::info!(
        user_id = %user.user_id,
        name = %original_name,
        mime = %mime_type,
        bytes = data.len(),
        "storing upload"
    );

    let blob = state.blob_store.store(&data, &original_name).await?;

    let media = store::insert_media(
        &state.pool,
        user.user_id,
        &blob.public_id,
        &blob.url,
        &mime_type,
        &original_name,
    )
    .await?;

    tracing::info!(media_id = %media.id, public_id = %blob.public_id, "upload stored");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": "File uploaded successfully",
            "mediaId": media.id,
            "url": media.url,
        })),
    ))
}

/// GET /api/media
pub async fn get_all_media(
    State(state): State<Arc<MediaState>>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let media = store::list_by_user(&state.pool, user.user_id).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "media": media,
    })))
}
