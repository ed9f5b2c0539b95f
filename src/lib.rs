//! User-generated memes: authenticated creation through an object store and a
//! record store, ownership-scoped deletion, and a listing mirror that only
//! follows confirmed remote state.

pub mod aws_clients;
pub mod config;
pub mod domain;
pub mod errors;
pub mod gallery;
pub mod handlers;
pub mod identity;
pub mod memory;
pub mod models;
pub mod notify;
pub mod repositories;
pub mod routes;
pub mod startup;
pub mod storage;
mod sync;
pub mod upload;
pub mod validation;

use crate::config::{Backend, Config};
use crate::domain::{FileStorage, IdentityProvider, MemeRepository};
use crate::errors::AppError;
use crate::gallery::Gallery;
use crate::notify::{LogNotifier, Notifier};
use crate::storage::PublicUrlStyle;
use crate::upload::UploadForm;
use std::sync::Arc;

/// Shared stores handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub meme_repo: Arc<dyn MemeRepository>,
    pub file_storage: Arc<dyn FileStorage>,
    pub notifier: Arc<dyn Notifier>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        meme_repo: Arc<dyn MemeRepository>,
        file_storage: Arc<dyn FileStorage>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            meme_repo,
            file_storage,
            notifier,
            max_upload_bytes: config::DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Wires stores for the configured backend. The AWS backend also makes
    /// sure its table and bucket exist.
    pub async fn from_config(config: &Config) -> Result<Self, AppError> {
        let (meme_repo, file_storage): (Arc<dyn MemeRepository>, Arc<dyn FileStorage>) = match config.backend {
            Backend::Memory => {
                tracing::warn!("Using in-memory stores; memes are lost on restart");
                let repo: Arc<dyn MemeRepository> = Arc::new(memory::InMemoryMemeRepository::new());
                let storage: Arc<dyn FileStorage> =
                    Arc::new(memory::InMemoryFileStorage::new(config.meme_bucket_name.clone()));
                (repo, storage)
            }
            Backend::Aws => {
                let sdk_config = aws_clients::create_sdk_config(config).await;
                let db_client = aws_clients::create_dynamodb_client(&sdk_config);
                let s3_client = aws_clients::create_s3_client(&sdk_config);

                startup::init_resources(
                    &db_client,
                    &s3_client,
                    &config.meme_table_name,
                    &config.meme_bucket_name,
                    &config.aws_region,
                )
                .await?;

                let url_style = match (&config.public_base_url, &config.localstack_endpoint) {
                    (Some(base), _) => PublicUrlStyle::Base(base.clone()),
                    (None, Some(endpoint)) => PublicUrlStyle::PathStyle {
                        endpoint: endpoint.clone(),
                    },
                    (None, None) => PublicUrlStyle::VirtualHosted {
                        region: config.aws_region.clone(),
                    },
                };
                let repo: Arc<dyn MemeRepository> = Arc::new(repositories::DynamoDbMemeRepository::new(
                    db_client,
                    config.meme_table_name.clone(),
                ));
                let storage: Arc<dyn FileStorage> = Arc::new(storage::S3FileStorage::new(
                    s3_client,
                    config.meme_bucket_name.clone(),
                    url_style,
                ));
                (repo, storage)
            }
        };

        Ok(Self {
            meme_repo,
            file_storage,
            notifier: Arc::new(LogNotifier),
            max_upload_bytes: config.max_upload_bytes,
        })
    }

    /// A fresh upload form acting as `identity`.
    pub fn upload_form(&self, identity: Arc<dyn IdentityProvider>) -> UploadForm {
        UploadForm::new(
            identity,
            self.file_storage.clone(),
            self.meme_repo.clone(),
            self.notifier.clone(),
        )
    }

    /// A fresh gallery acting as `identity`.
    pub fn gallery(&self, identity: Arc<dyn IdentityProvider>) -> Gallery {
        Gallery::new(identity, self.meme_repo.clone(), self.notifier.clone())
    }
}
