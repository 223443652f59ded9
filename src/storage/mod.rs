//! Blob storage abstractions for ingested images.
//!
//! Images are addressed by `(bucket, key)` where the key is
//! `{post_id}.{extension}`. Writes overwrite, so re-ingesting a post leaves a
//! single copy.
//!
//! ## Backends
//!
//! - [`S3BlobStore`]: AWS S3, used by the Lambda deployment (`s3` feature)
//! - [`LocalBlobStore`]: `{root}/{bucket}/{key}` on the local filesystem

pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

use async_trait::async_trait;

use crate::error::Result;

// Re-export for convenience
pub use local::LocalBlobStore;
#[cfg(feature = "s3")]
pub use s3::S3BlobStore;

/// Key/value blob store holding raw image bytes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `bytes` under `(bucket, key)`, replacing any existing object.
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Read the object at `(bucket, key)`.
    ///
    /// Returns [`AppError::NotFound`](crate::error::AppError::NotFound) if
    /// the object does not exist.
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
}
