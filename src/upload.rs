//! The meme creation form: validate, upload the image, then write the record.

use crate::domain::{FileStorage, IdentityProvider, MemeRepository};
use crate::errors::MemeError;
use crate::models::{Identity, ImageUpload, MemeRecord, NewMeme, OCTET_STREAM};
use crate::notify::{Notice, Notifier};
use crate::sync::{read, write};
use crate::validation::validate_submission;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use uuid::Uuid;

/// Editable contents of the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub description: String,
    pub image: Option<ImageUpload>,
}

struct FormState {
    draft: RwLock<Draft>,
    submitting: AtomicBool,
    dismissed: AtomicBool,
    created: watch::Sender<u64>,
}

/// Resets the in-flight flag however the submission ends.
struct Submitting<'a>(&'a AtomicBool);

impl Drop for Submitting<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Creates memes on behalf of the current identity.
///
/// Cloning yields another handle to the same form.
#[derive(Clone)]
pub struct UploadForm {
    identity: Arc<dyn IdentityProvider>,
    storage: Arc<dyn FileStorage>,
    repo: Arc<dyn MemeRepository>,
    notifier: Arc<dyn Notifier>,
    state: Arc<FormState>,
}

impl UploadForm {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        storage: Arc<dyn FileStorage>,
        repo: Arc<dyn MemeRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (created, _) = watch::channel(0);
        Self {
            identity,
            storage,
            repo,
            notifier,
            state: Arc::new(FormState {
                draft: RwLock::new(Draft::default()),
                submitting: AtomicBool::new(false),
                dismissed: AtomicBool::new(false),
                created,
            }),
        }
    }

    pub fn draft(&self) -> Draft {
        read(&self.state.draft).clone()
    }

    pub fn set_title(&self, title: impl Into<String>) {
        write(&self.state.draft).title = title.into();
    }

    pub fn set_description(&self, description: impl Into<String>) {
        write(&self.state.draft).description = description.into();
    }

    pub fn set_image(&self, image: ImageUpload) {
        write(&self.state.draft).image = Some(image);
    }

    pub fn clear_image(&self) {
        write(&self.state.draft).image = None;
    }

    pub fn is_submitting(&self) -> bool {
        self.state.submitting.load(Ordering::Acquire)
    }

    /// Ticks once per successful creation. Views watch it to know when to refresh.
    pub fn refresh_signal(&self) -> watch::Receiver<u64> {
        self.state.created.subscribe()
    }

    /// Detaches the form from its view. In-flight submissions still finish
    /// but leave the draft alone.
    pub fn dismiss(&self) {
        self.state.dismissed.store(true, Ordering::Release);
    }

    fn is_dismissed(&self) -> bool {
        self.state.dismissed.load(Ordering::Acquire)
    }

    /// Replaces the draft with the given values and submits it.
    pub async fn submit_values(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
        image: Option<ImageUpload>,
    ) -> Result<MemeRecord, MemeError> {
        *write(&self.state.draft) = Draft {
            title: title.into(),
            description: description.into(),
            image,
        };
        self.submit().await
    }

    /// Submits the current draft.
    ///
    /// Validation and authentication failures make no store calls. On success
    /// the draft is cleared and the refresh signal ticks; on failure the draft
    /// is kept for another attempt.
    pub async fn submit(&self) -> Result<MemeRecord, MemeError> {
        let draft = self.draft();

        if let Err(errors) = validate_submission(&draft.title, &draft.description, draft.image.as_ref()) {
            tracing::debug!(%errors, "Meme submission rejected by validation");
            return Err(MemeError::Validation(errors));
        }

        let Some(identity) = self.identity.current_identity() else {
            tracing::debug!("Meme submission rejected, no identity");
            self.notifier.notify(Notice::error(
                "Authentication required",
                "Please log in to create memes",
            ));
            return Err(MemeError::AuthRequired);
        };

        if self.state.submitting.swap(true, Ordering::AcqRel) {
            return Err(MemeError::SubmissionInProgress);
        }
        let _submitting = Submitting(&self.state.submitting);

        match self.persist(&identity, draft).await {
            Ok(record) => {
                if !self.is_dismissed() {
                    *write(&self.state.draft) = Draft::default();
                }
                self.state.created.send_modify(|n| *n += 1);
                tracing::info!(meme_id = %record.id, owner_id = %record.owner_id, "Meme created");
                self.notifier.notify(Notice::success(
                    "Meme created!",
                    "Your meme has been successfully created.",
                ));
                Ok(record)
            }
            Err(err) => {
                tracing::error!(error = %err, error.source = ?std::error::Error::source(&err), "Error creating meme");
                self.notifier.notify(Notice::error("Failed to create meme", err.user_message()));
                Err(err)
            }
        }
    }

    /// Upload strictly before insert: a record must never point at a missing blob.
    async fn persist(&self, identity: &Identity, draft: Draft) -> Result<MemeRecord, MemeError> {
        let image_url = match draft.image {
            Some(image) => {
                let key = storage_key(identity, &image);
                let content_type = content_type_for(&image);
                tracing::debug!(s3_key = %key, %content_type, "Uploading meme image");
                self.storage
                    .put(&key, image.data, &content_type)
                    .await
                    .map_err(MemeError::Upload)?
            }
            None => String::new(),
        };

        let new_meme = NewMeme {
            title: draft.title,
            description: draft.description,
            image_url,
            owner_id: identity.id().to_string(),
        };
        let orphan = new_meme.image_url.clone();

        self.repo.insert(new_meme).await.map_err(|e| {
            // No compensating delete; the blob stays behind.
            if !orphan.is_empty() {
                tracing::warn!(image_url = %orphan, "Record insert failed after upload, image left orphaned");
            }
            MemeError::Insert(e)
        })
    }
}

/// `{owner}/{random}.{ext}`: namespaced per identity so stores can authorize by prefix.
pub fn storage_key(identity: &Identity, image: &ImageUpload) -> String {
    format!("{}/{}.{}", identity.id(), Uuid::new_v4().simple(), image.extension())
}

fn content_type_for(image: &ImageUpload) -> String {
    image
        .resolved_content_type()
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}
