// Deletion cascade: a post removed in the post service takes its attached
// media with it here. Handlers run under at-least-once delivery, so every
// step tolerates already-deleted state.

use crate::bus::{Event, EventBus, EventHandler};
use crate::media::blob::BlobStore;
use crate::media::store;
use async_trait::async_trait;
use ripple_error::AppError;
use sqlx::PgPool;
use std::sync::Arc;

pub struct MediaCleanupHandler {
    pool: PgPool,
    blob_store: Arc<dyn BlobStore>,
    bus: Arc<EventBus>,
}

impl MediaCleanupHandler {
    pub fn new(pool: PgPool, blob_store: Arc<dyn BlobStore>, bus: Arc<EventBus>) -> Self {
        Self {
            pool,
            blob_store,
            bus,
        }
    }
}

#[async_trait]
impl EventHandler for MediaCleanupHandler {
    async fn handle(&self, event: Event) -> Result<(), AppError> {
        let payload = match event {
            Event::PostDeleted(payload) => payload,
            other => {
                tracing::debug!(routing_key = other.routing_key(), "ignoring unrelated event");
                return Ok(());
            }
        };

        if payload.media_ids.is_empty() {
            return Ok(());
        }

        // Absent rows mean the cascade (or a concurrent instance) already ran.
        let media = store::find_by_ids(&self.pool, &payload.media_ids).await?;
        if media.is_empty() {
            tracing::info!(
                post_id = %payload.post_id,
                "no media left to clean up, treating as already applied"
            );
            return Ok(());
        }

        for item in &media {
            self.blob_store.delete(&item.public_id).await?;
        }

        let removed_ids: Vec<_> = media.iter().map(|m| m.id).collect();
        let removed = store::delete_by_ids(&self.pool, &removed_ids).await?;

        tracing::info!(
            post_id = %payload.post_id,
            removed,
            "media removed after post deletion"
        );

        // Fire-and-forget: cache owners sweep on this, and their TTLs bound
        // staleness if the announcement is lost.
        self.bus
            .publish_background(Event::media_deleted(removed_ids, Some(payload.post_id)));

        Ok(())
    }
}
