// ============================================================================
// Media Configuration
// ============================================================================

use crate::{env_or, env_parse_or};

/// Blob storage settings for the media service
#[derive(Clone, Debug)]
pub struct MediaConfig {
    /// Root directory for the filesystem blob store
    pub storage_root: String,
    /// Public base URL prefixed to stored blob identifiers
    pub public_base_url: String,
    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: usize,
}

impl MediaConfig {
    pub(crate) fn from_env() -> Self {
        Self {
            storage_root: env_or("MEDIA_STORAGE_ROOT", "./media-storage"),
            public_base_url: env_or("MEDIA_PUBLIC_BASE_URL", "http://localhost:3003/files"),
            max_upload_bytes: env_parse_or("MEDIA_MAX_UPLOAD_BYTES", 5 * 1024 * 1024usize),
        }
    }
}
