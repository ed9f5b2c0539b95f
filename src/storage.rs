use crate::{domain::FileStorage, errors::StorageError};
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_s3::{primitives::ByteStream, Client as S3Client};
use bytes::Bytes;

/// How public URLs for stored objects are formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicUrlStyle {
    /// `{base}/{key}`, e.g. a CDN or LocalStack endpoint with the bucket already in it.
    Base(String),
    /// `{endpoint}/{bucket}/{key}`, for path-style endpoints such as LocalStack.
    PathStyle { endpoint: String },
    /// `https://{bucket}.s3.{region}.amazonaws.com/{key}`.
    VirtualHosted { region: String },
}

#[derive(Debug, Clone)]
pub struct S3FileStorage {
    client: S3Client,
    bucket_name: String,
    url_style: PublicUrlStyle,
}

impl S3FileStorage {
    pub fn new(client: S3Client, bucket_name: String, url_style: PublicUrlStyle) -> Self {
        tracing::info!(bucket = %bucket_name, ?url_style, "Initializing S3FileStorage");
        Self {
            client,
            bucket_name,
            url_style,
        }
    }

    pub fn public_url(&self, key: &str) -> String {
        public_url(&self.url_style, &self.bucket_name, key)
    }
}

pub fn public_url(style: &PublicUrlStyle, bucket: &str, key: &str) -> String {
    match style {
        PublicUrlStyle::Base(base) => format!("{}/{}", base.trim_end_matches('/'), key),
        PublicUrlStyle::PathStyle { endpoint } => {
            format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key)
        }
        PublicUrlStyle::VirtualHosted { region } => {
            format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key)
        }
    }
}

#[async_trait]
impl FileStorage for S3FileStorage {
    /// Uploads data to S3 using PutObject and returns the object's public URL.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String, StorageError> {
        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, %content_type, "S3: Uploading file");

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .context(format!("S3: Failed to upload object with key '{}'", key))
            .map_err(|e| StorageError::UploadFailed(format!("{:#}", e)))?;

        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, "S3: Upload successful");
        Ok(self.public_url(key))
    }
}
