//! In-process stores for local development and tests.
//!
//! Both stores keep everything in a map behind a `tokio::sync::RwLock`; data
//! is lost when they are dropped.

use crate::domain::{FileStorage, MemeRepository};
use crate::errors::{RepoError, StorageError};
use crate::models::{sort_newest_first, DeleteOutcome, MemeRecord, NewMeme};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
}

#[derive(Debug)]
pub struct InMemoryFileStorage {
    bucket_name: String,
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl InMemoryFileStorage {
    pub fn new(bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("memory://{}/{}", self.bucket_name, key)
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl FileStorage for InMemoryFileStorage {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String, StorageError> {
        if key.is_empty() || key.starts_with('/') {
            return Err(StorageError::UploadFailed(format!("invalid object key '{}'", key)));
        }
        tracing::debug!(key = %key, bytes = data.len(), "Memory: storing object");
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(self.url_for(key))
    }
}

#[derive(Debug, Default)]
struct Table {
    rows: HashMap<Uuid, MemeRecord>,
    last_created: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct InMemoryMemeRepository {
    table: RwLock<Table>,
}

impl InMemoryMemeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl MemeRepository for InMemoryMemeRepository {
    async fn insert(&self, meme: NewMeme) -> Result<MemeRecord, RepoError> {
        let mut table = self.table.write().await;

        // Keep timestamps strictly increasing so insertion order is list order.
        let now = Utc::now();
        let created_at = match table.last_created {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        table.last_created = Some(created_at);

        let record = MemeRecord {
            id: Uuid::new_v4(),
            title: meme.title,
            description: meme.description,
            image_url: meme.image_url,
            owner_id: meme.owner_id,
            created_at,
        };
        table.rows.insert(record.id, record.clone());
        tracing::debug!(meme_id = %record.id, "Memory: inserted meme");
        Ok(record)
    }

    async fn list_newest_first(&self) -> Result<Vec<MemeRecord>, RepoError> {
        let mut records: Vec<MemeRecord> = self.table.read().await.rows.values().cloned().collect();
        sort_newest_first(&mut records);
        Ok(records)
    }

    async fn delete(&self, id: Uuid, owner_id: &str) -> Result<DeleteOutcome, RepoError> {
        let mut table = self.table.write().await;
        match table.rows.get(&id) {
            None => Ok(DeleteOutcome::NotFound),
            Some(record) if record.owner_id != owner_id => Err(RepoError::NotOwner(id)),
            Some(_) => {
                table.rows.remove(&id);
                tracing::debug!(meme_id = %id, "Memory: deleted meme");
                Ok(DeleteOutcome::Deleted)
            }
        }
    }
}
