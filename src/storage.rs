// SPDX-License-Identifier: MIT

//! Blob storage seam.
//!
//! Payload archives and offloaded enriched events live in Cloud
//! Storage; the pipeline core only sees the [`BlobStore`] trait so tests
//! run against an in-memory map.

use crate::error::{AppError, Result};
use async_trait::async_trait;
use google_cloud_storage::client::{Client, ClientConfig};
use google_cloud_storage::http::objects::download::Range;
use google_cloud_storage::http::objects::get::GetObjectRequest;
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, bucket: &str, object: &str, data: Vec<u8>) -> Result<()>;

    async fn get(&self, bucket: &str, object: &str) -> Result<Vec<u8>>;
}

/// Render a `gs://bucket/object` URI.
pub fn gcs_uri(bucket: &str, object: &str) -> String {
    format!("gs://{bucket}/{object}")
}

/// Split a `gs://bucket/object` URI into `(bucket, object)`.
pub fn parse_gcs_uri(uri: &str) -> Result<(&str, &str)> {
    let rest = uri
        .strip_prefix("gs://")
        .ok_or_else(|| AppError::BadRequest(format!("not a gs:// URI: {uri}")))?;
    let (bucket, object) = rest
        .split_once('/')
        .ok_or_else(|| AppError::BadRequest(format!("gs:// URI missing object path: {uri}")))?;
    if bucket.is_empty() || object.is_empty() {
        return Err(AppError::BadRequest(format!("malformed gs:// URI: {uri}")));
    }
    Ok((bucket, object))
}

/// Cloud Storage implementation.
pub struct GcsBlobStore {
    client: Client,
}

impl GcsBlobStore {
    /// Connect using application default credentials.
    pub async fn new() -> Result<Self> {
        let config = ClientConfig::default()
            .with_auth()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to configure GCS client: {}", e)))?;
        Ok(Self {
            client: Client::new(config),
        })
    }
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn put(&self, bucket: &str, object: &str, data: Vec<u8>) -> Result<()> {
        let media = Media::new(object.to_string());
        self.client
            .upload_object(
                &UploadObjectRequest {
                    bucket: bucket.to_string(),
                    ..Default::default()
                },
                data,
                &UploadType::Simple(media),
            )
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, bucket: &str, object: &str) -> Result<Vec<u8>> {
        self.client
            .download_object(
                &GetObjectRequest {
                    bucket: bucket.to_string(),
                    object: object.to_string(),
                    ..Default::default()
                },
                &Range::default(),
            )
            .await
            .map_err(|e| AppError::Storage(e.to_string()))
    }
}
