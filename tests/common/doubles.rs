//! Store doubles that record every call and can be told to fail or pause.

use async_trait::async_trait;
use bytes::Bytes;
use meme_board::domain::{FileStorage, MemeRepository};
use meme_board::errors::{RepoError, StorageError};
use meme_board::memory::{InMemoryFileStorage, InMemoryMemeRepository};
use meme_board::models::{DeleteOutcome, MemeRecord, NewMeme};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Put { key: String, content_type: String },
    Insert { title: String, image_url: String },
    List,
    Delete { id: Uuid, owner_id: String },
}

#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.0.lock().unwrap().iter().filter(|c| pred(c)).count()
    }
}

/// Held by a test to park store calls until it is released.
#[derive(Debug, Default)]
pub struct Gate(RwLock<()>);

impl Gate {
    async fn pass(&self) {
        let _open = self.0.read().await;
    }

    pub async fn close(&self) -> tokio::sync::RwLockWriteGuard<'_, ()> {
        self.0.write().await
    }
}

pub struct RecordingStorage {
    pub inner: InMemoryFileStorage,
    log: CallLog,
    pub fail_puts: AtomicBool,
}

impl RecordingStorage {
    pub fn new(log: CallLog) -> Self {
        Self {
            inner: InMemoryFileStorage::new("memes"),
            log,
            fail_puts: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl FileStorage for RecordingStorage {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String, StorageError> {
        self.log.push(Call::Put {
            key: key.to_string(),
            content_type: content_type.to_string(),
        });
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::UploadFailed("bucket unavailable".to_string()));
        }
        self.inner.put(key, data, content_type).await
    }
}

pub struct RecordingRepository {
    pub inner: InMemoryMemeRepository,
    log: CallLog,
    pub fail_inserts: AtomicBool,
    pub fail_lists: AtomicBool,
    pub fail_deletes: AtomicBool,
    /// Return lists oldest first, like a store that ignores ordering.
    pub reverse_lists: AtomicBool,
    pub inserts: Gate,
    pub deletes: Gate,
    held_list: Mutex<Option<oneshot::Receiver<()>>>,
}

impl RecordingRepository {
    pub fn new(log: CallLog) -> Self {
        Self {
            inner: InMemoryMemeRepository::new(),
            log,
            fail_inserts: AtomicBool::new(false),
            fail_lists: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            reverse_lists: AtomicBool::new(false),
            inserts: Gate::default(),
            deletes: Gate::default(),
            held_list: Mutex::new(None),
        }
    }

    /// The next list call reads the store, then waits for the returned sender
    /// before answering. Later list calls are unaffected.
    pub fn hold_next_list(&self) -> oneshot::Sender<()> {
        let (release, held) = oneshot::channel();
        *self.held_list.lock().unwrap() = Some(held);
        release
    }
}

fn backend_error(what: &str) -> RepoError {
    RepoError::BackendError(anyhow::anyhow!("{} failed: connection reset", what))
}

#[async_trait]
impl MemeRepository for RecordingRepository {
    async fn insert(&self, meme: NewMeme) -> Result<MemeRecord, RepoError> {
        self.log.push(Call::Insert {
            title: meme.title.clone(),
            image_url: meme.image_url.clone(),
        });
        self.inserts.pass().await;
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(backend_error("insert"));
        }
        self.inner.insert(meme).await
    }

    async fn list_newest_first(&self) -> Result<Vec<MemeRecord>, RepoError> {
        self.log.push(Call::List);
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(backend_error("scan"));
        }
        let held = self.held_list.lock().unwrap().take();
        let mut records = self.inner.list_newest_first().await?;
        if let Some(held) = held {
            let _ = held.await;
        }
        if self.reverse_lists.load(Ordering::SeqCst) {
            records.reverse();
        }
        Ok(records)
    }

    async fn delete(&self, id: Uuid, owner_id: &str) -> Result<DeleteOutcome, RepoError> {
        self.log.push(Call::Delete {
            id,
            owner_id: owner_id.to_string(),
        });
        self.deletes.pass().await;
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(backend_error("delete"));
        }
        self.inner.delete(id, owner_id).await
    }
}
