// Remote-origin cache invalidation: when the media service removes media,
// cached post listings embedding those attachments are stale.

use crate::bus::{Event, EventHandler};
use crate::posts::handlers::LIST_NAMESPACE;
use async_trait::async_trait;
use ripple_error::AppError;
use ripple_redis::Cache;

pub struct PostCacheInvalidator {
    cache: Cache,
}

impl PostCacheInvalidator {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl EventHandler for PostCacheInvalidator {
    async fn handle(&self, event: Event) -> Result<(), AppError> {
        match event {
            Event::MediaDeleted(payload) => {
                // Sweeping an already-empty namespace is a no-op, so a
                // redelivered event changes nothing.
                let removed = self.cache.invalidate_namespace(LIST_NAMESPACE).await?;
                tracing::info!(
                    media_count = payload.media_ids.len(),
                    post_id = ?payload.post_id,
                    removed,
                    "post listing cache swept after remote media deletion"
                );
                Ok(())
            }
            other => {
                tracing::debug!(routing_key = other.routing_key(), "ignoring unrelated event");
                Ok(())
            }
        }
    }
}
