// Post persistence boundary.

use chrono::{DateTime, Utc};
use ripple_error::AppError;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub media_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Idempotent schema setup, run at service startup.
pub async fn init_schema(pool: &PgPool) -> Result<(), AppError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            id UUID PRIMARY KEY,
            user_id UUID NOT NULL,
            content TEXT NOT NULL,
            media_ids UUID[] NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS posts_created_at_idx ON posts (created_at DESC)")
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn insert_post(
    pool: &PgPool,
    user_id: Uuid,
    content: &str,
    media_ids: &[Uuid],
) -> Result<Post, AppError> {
    let post = sqlx::query_as::<_, Post>(
        "INSERT INTO posts (id, user_id, content, media_ids)
         VALUES ($1, $2, $3, $4)
         RETURNING id, user_id, content, media_ids, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(content)
    .bind(media_ids)
    .fetch_one(pool)
    .await?;
    Ok(post)
}

/// Newest-first page of posts plus the total count for pagination metadata.
pub async fn list_posts(
    pool: &PgPool,
    page: u32,
    limit: u32,
) -> Result<(Vec<Post>, i64), AppError> {
    let offset = (page.saturating_sub(1) as i64) * limit as i64;

    let posts = sqlx::query_as::<_, Post>(
        "SELECT id, user_id, content, media_ids, created_at
         FROM posts ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(limit as i64)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(pool)
        .await?;

    Ok((posts, total))
}

pub async fn get_post(pool: &PgPool, id: Uuid) -> Result<Option<Post>, AppError> {
    let post = sqlx::query_as::<_, Post>(
        "SELECT id, user_id, content, media_ids, created_at FROM posts WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(post)
}

pub async fn update_post(
    pool: &PgPool,
    id: Uuid,
    content: &str,
) -> Result<Option<Post>, AppError> {
    let post = sqlx::query_as::<_, Post>(
        "UPDATE posts SET content = $2 WHERE id = $1
         RETURNING id, user_id, content, media_ids, created_at",
    )
    .bind(id)
    .bind(content)
    .fetch_optional(pool)
    .await?;
    Ok(post)
}

/// Returns true when a row was actually removed, so a repeated delete stays
/// a no-op.
pub async fn delete_post(pool: &PgPool, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
