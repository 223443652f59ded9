//! AWS S3 blob storage implementation.
//!
//! The client is constructed once by the caller and handed in, so tests and
//! alternative endpoints never depend on process-wide state.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;

use crate::error::{AppError, Result};
use crate::storage::BlobStore;

/// S3-backed image storage.
#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
}

impl S3BlobStore {
    /// Create a new S3 store around an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create S3 storage from the default AWS environment configuration.
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::S3(format!("put s3://{bucket}/{key}: {e}")))?;

        log::debug!("Wrote {} bytes to s3://{}/{}", size, bucket, key);
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let result = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let bytes = output.body.collect().await.map_err(|e| {
                    AppError::S3(format!("read s3://{bucket}/{key}: {e}"))
                })?;
                Ok(bytes.into_bytes().to_vec())
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    Err(AppError::not_found(bucket, key))
                } else {
                    Err(AppError::S3(format!(
                        "get s3://{bucket}/{key}: {service_err}"
                    )))
                }
            }
        }
    }
}
