// Media persistence boundary.

use chrono::{DateTime, Utc};
use ripple_error::AppError;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: Uuid,
    pub user_id: Uuid,
    pub public_id: String,
    pub url: String,
    pub mime_type: String,
    pub original_name: String,
    pub created_at: DateTime<Utc>,
}

/// Idempotent schema setup, run at service startup.
pub async fn init_schema(pool: &PgPool) -> Result<(), AppError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS media (
            id UUID PRIMARY KEY,
            user_id UUID NOT NULL,
            public_id TEXT NOT NULL UNIQUE,
            url TEXT NOT NULL,
            mime_type VARCHAR(100) NOT NULL,
            original_name VARCHAR(255) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_media(
    pool: &PgPool,
    user_id: Uuid,
    public_id: &str,
    url: &str,
    mime_type: &str,
    original_name: &str,
) -> Result<Media, AppError> {
    let media = sqlx::query_as::<_, Media>(
        "INSERT INTO media (id, user_id, public_id, url, mime_type, original_name)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING id, user_id, public_id, url, mime_type, original_name, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(public_id)
    .bind(url)
    .bind(mime_type)
    .bind(original_name)
    .fetch_one(pool)
    .await?;
    Ok(media)
}

pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Media>, AppError> {
    let media = sqlx::query_as::<_, Media>(
        "SELECT id, user_id, public_id, url, mime_type, original_name, created_at
         FROM media WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(media)
}

/// Rows for the given ids; absent ids are simply not returned, which keeps
/// the deletion cascade tolerant of redelivery.
pub async fn find_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Media>, AppError> {
    let media = sqlx::query_as::<_, Media>(
        "SELECT id, user_id, public_id, url, mime_type, original_name, created_at
         FROM media WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;
    Ok(media)
}

pub async fn delete_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM media WHERE id = ANY($1)")
        .bind(ids)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
