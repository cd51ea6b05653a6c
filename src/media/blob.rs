// Blob storage boundary: accepts a byte buffer, returns a stable identifier
// and a retrieval address. The filesystem implementation is the only one the
// deployment currently needs; the trait is the seam a hosted object store
// would plug into.

use async_trait::async_trait;
use ripple_error::AppError;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredBlob {
    /// Stable identifier, usable for later deletion
    pub public_id: String,
    /// Retrieval address handed to clients
    pub url: String,
}

#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    async fn store(&self, data: &[u8], original_name: &str) -> Result<StoredBlob, AppError>;
    /// Deleting an absent blob is a no-op, so cascades stay idempotent.
    async fn delete(&self, public_id: &str) -> Result<(), AppError>;
}

/// Filesystem-backed blob store.
pub struct FsBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    fn blob_path(&self, public_id: &str) -> Result<PathBuf, AppError> {
        // public_id is generated by us, but never trust it on the way back in.
        if public_id.contains('/') || public_id.contains("..") {
            return Err(AppError::validation("invalid blob identifier"));
        }
        Ok(self.root.join(public_id))
    }
}

/// Keep only a safe extension from a client-supplied filename.
fn sanitized_extension(original_name: &str) -> Option<&str> {
    let ext = Path::new(original_name).extension()?.to_str()?;
    if ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(ext)
    } else {
        None
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn store(&self, data: &[u8], original_name: &str) -> Result<StoredBlob, AppError> {
        let public_id = match sanitized_extension(original_name) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext.to_ascii_lowercase()),
            None => Uuid::new_v4().to_string(),
        };

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&public_id), data).await?;

        let url = format!("{}/{}", self.public_base_url.trim_end_matches('/'), public_id);
        Ok(StoredBlob { public_id, url })
    }

    async fn delete(&self, public_id: &str) -> Result<(), AppError> {
        let path = self.blob_path(public_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}
