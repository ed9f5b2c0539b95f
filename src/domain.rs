use crate::errors::{RepoError, StorageError};
use crate::models::{DeleteOutcome, Identity, MemeRecord, NewMeme};
use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

/// Answers "who is acting right now". Read-only from the board's point of view.
pub trait IdentityProvider: Send + Sync + 'static {
    fn current_identity(&self) -> Option<Identity>;
}

/// Trait defining operations for storing and retrieving Meme metadata.
#[async_trait]
pub trait MemeRepository: Send + Sync + 'static { // Send+Sync+'static required for Arc<dyn>
    /// Persists a new meme. The store assigns `id` and `created_at`.
    async fn insert(&self, meme: NewMeme) -> Result<MemeRecord, RepoError>;

    /// Lists every meme, newest `created_at` first, ties by `id` descending.
    async fn list_newest_first(&self) -> Result<Vec<MemeRecord>, RepoError>;

    /// Deletes `id` if `owner_id` owns it.
    /// A missing id is `Ok(DeleteOutcome::NotFound)`; a foreign one is `RepoError::NotOwner`.
    async fn delete(&self, id: Uuid, owner_id: &str) -> Result<DeleteOutcome, RepoError>;
}

/// Trait defining operations for storing file data (meme images).
#[async_trait]
pub trait FileStorage: Send + Sync + 'static {
    /// Uploads file data under `key` and returns its public retrieval URL.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String, StorageError>;
}
