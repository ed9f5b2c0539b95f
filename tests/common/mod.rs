#![allow(dead_code)]

pub mod doubles;

use doubles::{CallLog, RecordingRepository, RecordingStorage};
use meme_board::gallery::Gallery;
use meme_board::identity::SessionIdentity;
use meme_board::models::{Identity, ImageUpload};
use meme_board::notify::{ChannelNotifier, Notice};
use meme_board::upload::UploadForm;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One client session wired to recording stores.
pub struct Harness {
    pub log: CallLog,
    pub storage: Arc<RecordingStorage>,
    pub repo: Arc<RecordingRepository>,
    pub identity: Arc<SessionIdentity>,
    pub form: UploadForm,
    pub gallery: Gallery,
    pub notices: mpsc::UnboundedReceiver<Notice>,
}

impl Harness {
    pub fn new(identity: Option<&str>) -> Self {
        let log = CallLog::default();
        let storage = Arc::new(RecordingStorage::new(log.clone()));
        let repo = Arc::new(RecordingRepository::new(log.clone()));
        Self::with_stores(identity, log, storage, repo)
    }

    /// Another session sharing this harness's stores.
    pub fn second_session(&self, identity: Option<&str>) -> Harness {
        Self::with_stores(identity, self.log.clone(), self.storage.clone(), self.repo.clone())
    }

    fn with_stores(
        identity: Option<&str>,
        log: CallLog,
        storage: Arc<RecordingStorage>,
        repo: Arc<RecordingRepository>,
    ) -> Self {
        let identity = Arc::new(SessionIdentity::new(identity.map(identity_of)));
        let (notifier, notices) = ChannelNotifier::new();
        let notifier = Arc::new(notifier);
        let form = UploadForm::new(identity.clone(), storage.clone(), repo.clone(), notifier.clone());
        let gallery = Gallery::new(identity.clone(), repo.clone(), notifier);
        Self {
            log,
            storage,
            repo,
            identity,
            form,
            gallery,
            notices,
        }
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            notices.push(notice);
        }
        notices
    }
}

pub fn identity_of(id: &str) -> Identity {
    Identity::new(id).expect("valid identity")
}

pub fn png(name: &str) -> ImageUpload {
    ImageUpload::new(Some(name.to_string()), Some("image/png".to_string()), vec![0x89, b'P', b'N', b'G'])
}

/// Yields until `condition` holds, for sequencing spawned tasks.
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
