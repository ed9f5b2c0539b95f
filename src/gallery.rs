//! The meme listing and its local mirror.
//!
//! The mirror only changes on confirmed remote outcomes: a successful list
//! replaces it, a confirmed delete removes one record. Failures leave it as
//! it was and surface as a notice.

use crate::domain::{IdentityProvider, MemeRepository};
use crate::errors::{MemeError, RepoError};
use crate::models::{sort_newest_first, DeleteOutcome, MemeRecord};
use crate::notify::{Notice, Notifier};
use crate::sync::{read, write};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// A listed meme plus whether the current identity may delete it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GalleryEntry {
    #[serde(flatten)]
    pub record: MemeRecord,
    pub can_delete: bool,
}

#[derive(Debug, Default)]
struct Mirror {
    records: Vec<MemeRecord>,
    loading: bool,
    loaded: bool,
    error: Option<String>,
    /// Deletes confirmed since the current refresh ticket was issued.
    deleted_since_ticket: Vec<Uuid>,
}

struct GalleryState {
    mirror: RwLock<Mirror>,
    /// Last refresh ticket handed out; only that refresh may replace the mirror.
    tickets: AtomicU64,
    dismissed: AtomicBool,
}

/// Cloning yields another handle to the same mirror.
#[derive(Clone)]
pub struct Gallery {
    identity: Arc<dyn IdentityProvider>,
    repo: Arc<dyn MemeRepository>,
    notifier: Arc<dyn Notifier>,
    state: Arc<GalleryState>,
}

impl Gallery {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        repo: Arc<dyn MemeRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            identity,
            repo,
            notifier,
            state: Arc::new(GalleryState {
                mirror: RwLock::new(Mirror::default()),
                tickets: AtomicU64::new(0),
                dismissed: AtomicBool::new(false),
            }),
        }
    }

    pub fn records(&self) -> Vec<MemeRecord> {
        read(&self.state.mirror).records.clone()
    }

    /// Mirrored records with delete offered only to their owner.
    pub fn entries(&self) -> Vec<GalleryEntry> {
        let me = self.identity.current_identity();
        read(&self.state.mirror)
            .records
            .iter()
            .map(|record| GalleryEntry {
                can_delete: record.is_owned_by(me.as_ref()),
                record: record.clone(),
            })
            .collect()
    }

    pub fn is_loading(&self) -> bool {
        read(&self.state.mirror).loading
    }

    /// True once a load has succeeded and found nothing.
    pub fn is_empty(&self) -> bool {
        let mirror = read(&self.state.mirror);
        mirror.loaded && mirror.records.is_empty()
    }

    /// Message from the last failed load, cleared by the next successful one.
    pub fn error(&self) -> Option<String> {
        read(&self.state.mirror).error.clone()
    }

    /// Detaches the gallery from its view. In-flight operations complete but
    /// no longer touch the mirror.
    pub fn dismiss(&self) {
        self.state.dismissed.store(true, Ordering::Release);
    }

    fn is_dismissed(&self) -> bool {
        self.state.dismissed.load(Ordering::Acquire)
    }

    fn is_current(&self, ticket: u64) -> bool {
        !self.is_dismissed() && self.state.tickets.load(Ordering::Acquire) == ticket
    }

    /// Reloads every record and replaces the mirror with the result.
    pub async fn refresh(&self) -> Result<Vec<MemeRecord>, MemeError> {
        let ticket = {
            let mut mirror = write(&self.state.mirror);
            mirror.deleted_since_ticket.clear();
            if !self.is_dismissed() {
                mirror.loading = true;
            }
            self.state.tickets.fetch_add(1, Ordering::AcqRel) + 1
        };

        match self.repo.list_newest_first().await {
            Ok(mut records) => {
                sort_newest_first(&mut records);
                tracing::debug!(count = records.len(), "Loaded memes");
                let mut mirror = write(&self.state.mirror);
                if self.is_current(ticket) {
                    // The list may predate deletes confirmed while it was in flight.
                    let deleted = std::mem::take(&mut mirror.deleted_since_ticket);
                    records.retain(|r| !deleted.contains(&r.id));
                    mirror.records = records.clone();
                    mirror.loading = false;
                    mirror.loaded = true;
                    mirror.error = None;
                } else {
                    tracing::debug!(ticket, "Discarding superseded meme list");
                }
                Ok(records)
            }
            Err(e) => {
                let err = MemeError::Fetch(e);
                tracing::error!(error = %err, error.source = ?std::error::Error::source(&err), "Error loading memes");
                self.notifier.notify(Notice::error("Failed to load memes", err.user_message()));
                let mut mirror = write(&self.state.mirror);
                if self.is_current(ticket) {
                    mirror.loading = false;
                    mirror.error = Some(err.user_message());
                }
                Err(err)
            }
        }
    }

    /// Deletes a meme owned by the current identity.
    ///
    /// Only a confirmed remote delete removes the record from the mirror. An id
    /// that is already gone yields `DeleteOutcome::NotFound`, not an error.
    pub async fn delete(&self, id: Uuid) -> Result<DeleteOutcome, MemeError> {
        let Some(identity) = self.identity.current_identity() else {
            tracing::debug!(meme_id = %id, "Delete rejected, no identity");
            self.notifier.notify(Notice::error(
                "Authentication required",
                "Please log in to delete memes",
            ));
            return Err(MemeError::AuthRequired);
        };

        let foreign = read(&self.state.mirror)
            .records
            .iter()
            .any(|r| r.id == id && r.owner_id != identity.id());
        if foreign {
            tracing::debug!(meme_id = %id, "Delete rejected, not the owner");
            return Err(MemeError::NotOwner(id));
        }

        let outcome = match self.repo.delete(id, identity.id()).await {
            Ok(outcome) => outcome,
            Err(RepoError::NotFound(_)) => DeleteOutcome::NotFound,
            Err(RepoError::NotOwner(id)) => {
                tracing::debug!(meme_id = %id, "Delete refused by store, not the owner");
                self.notifier.notify(Notice::error(
                    "Failed to delete meme",
                    "You can only delete your own memes",
                ));
                return Err(MemeError::NotOwner(id));
            }
            Err(e) => {
                let err = MemeError::Delete(e);
                tracing::error!(meme_id = %id, error = %err, error.source = ?std::error::Error::source(&err), "Error deleting meme");
                self.notifier.notify(Notice::error("Failed to delete meme", err.user_message()));
                return Err(err);
            }
        };

        // Either way the record is confirmed absent remotely.
        if !self.is_dismissed() {
            let mut mirror = write(&self.state.mirror);
            mirror.records.retain(|r| r.id != id);
            mirror.deleted_since_ticket.push(id);
        }
        match outcome {
            DeleteOutcome::Deleted => {
                tracing::info!(meme_id = %id, "Meme deleted");
                self.notifier.notify(Notice::success("Meme deleted", "Your meme has been removed."));
            }
            DeleteOutcome::NotFound => {
                tracing::debug!(meme_id = %id, "Meme already gone, nothing to delete");
            }
        }
        Ok(outcome)
    }
}
