use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

/// A persisted meme. Records are created and deleted, never updated.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MemeRecord {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Retrieval URL of the uploaded image, `""` when the meme has none.
    pub image_url: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

impl MemeRecord {
    pub fn has_image(&self) -> bool {
        !self.image_url.is_empty()
    }

    pub fn is_owned_by(&self, identity: Option<&Identity>) -> bool {
        identity.is_some_and(|who| who.id() == self.owner_id)
    }
}

/// Insert payload handed to a `MemeRepository`. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMeme {
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub owner_id: String,
}

/// Presentation order: newest `created_at` first, ties broken by `id` descending.
pub fn newest_first(a: &MemeRecord, b: &MemeRecord) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

pub fn sort_newest_first(records: &mut [MemeRecord]) {
    records.sort_by(newest_first);
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("identity id cannot be empty")]
    Empty,
    #[error("identity id cannot contain '/': {0}")]
    InvalidChar(String),
}

/// The authenticated principal. Opaque beyond its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    id: String,
}

impl Identity {
    /// The id becomes the storage path prefix, so it must be a single path segment.
    pub fn new(id: impl Into<String>) -> Result<Self, IdentityError> {
        let id = id.into();
        if id.is_empty() {
            return Err(IdentityError::Empty);
        }
        if id.contains('/') {
            return Err(IdentityError::InvalidChar(id));
        }
        Ok(Self { id })
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Image bytes attached to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl ImageUpload {
    pub fn new(file_name: Option<String>, content_type: Option<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name,
            content_type,
            data: data.into(),
        }
    }

    /// Lowercased extension of the supplied file name, `bin` when there is none.
    pub fn extension(&self) -> String {
        self.file_name
            .as_deref()
            .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext))
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_else(|| "bin".to_string())
    }

    /// The declared content type, or one guessed from the file name when the
    /// client sent none or only `application/octet-stream`.
    pub fn resolved_content_type(&self) -> Option<String> {
        self.content_type
            .as_deref()
            .map(|ct| ct.trim().to_ascii_lowercase())
            .filter(|ct| !ct.is_empty() && ct != OCTET_STREAM)
            .or_else(|| {
                mime_guess::from_ext(&self.extension())
                    .first_raw()
                    .filter(|ct| *ct != OCTET_STREAM)
                    .map(str::to_string)
            })
    }
}

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Result of a delete that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    /// The id was already gone. Treated as success by callers.
    NotFound,
}
