// src/services/fetch.rs

//! Fetch-and-store worker.
//!
//! Downloads a single candidate image and writes it to blob storage under
//! `{post_id}.{extension}`, where the extension comes from the response's
//! `Content-Type`.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;

use crate::error::{AppError, Result};
use crate::models::{CandidatePost, FetchOutcome};
use crate::storage::BlobStore;
use crate::utils::AllowList;
use crate::utils::http::media_type;

/// A downloaded response body with its declared content type.
#[derive(Debug, Clone)]
pub struct Download {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Source of image bytes.
#[async_trait]
pub trait ImageDownloader: Send + Sync {
    async fn download(&self, url: &str) -> Result<Download>;
}

/// Downloads images over HTTP, buffering the whole body.
#[derive(Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageDownloader for HttpDownloader {
    async fn download(&self, url: &str) -> Result<Download> {
        let response = self.client.get(url).send().await?.error_for_status()?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();

        Ok(Download {
            bytes,
            content_type,
        })
    }
}

/// File extension for a `Content-Type` value: the part after the first `/`.
///
/// The type is not checked to be an image; `text/html` yields `html`.
pub fn extension_for(content_type: &str) -> Option<String> {
    let (_, subtype) = media_type(content_type).split_once('/')?;
    let extension = subtype.trim().to_ascii_lowercase();
    (!extension.is_empty()).then_some(extension)
}

/// Worker that moves one candidate image into storage.
#[derive(Clone)]
pub struct ImageFetcher {
    downloader: Arc<dyn ImageDownloader>,
    store: Arc<dyn BlobStore>,
    allow_list: Arc<AllowList>,
    bucket: String,
}

impl ImageFetcher {
    pub fn new(
        downloader: Arc<dyn ImageDownloader>,
        store: Arc<dyn BlobStore>,
        allow_list: AllowList,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            downloader,
            store,
            allow_list: Arc::new(allow_list),
            bucket: bucket.into(),
        }
    }

    /// Download `post.url` and store it as `{post.id}.{extension}`.
    ///
    /// URLs outside the allow list are skipped without any network access.
    pub async fn fetch_and_store(&self, post: &CandidatePost) -> Result<FetchOutcome> {
        if !self.allow_list.is_allowed(&post.url) {
            log::debug!("Skipping {} ({}): not an allowed image URL", post.id, post.url);
            return Ok(FetchOutcome::Skipped);
        }

        let download = self.downloader.download(&post.url).await?;

        let content_type = download
            .content_type
            .as_deref()
            .ok_or_else(|| AppError::download(&post.url, "response has no Content-Type"))?;
        let extension = extension_for(content_type).ok_or_else(|| {
            AppError::download(&post.url, format!("unusable Content-Type '{content_type}'"))
        })?;

        let key = post.storage_key(&extension);
        let content_type = media_type(content_type).to_string();
        self.store
            .put(&self.bucket, &key, download.bytes, &content_type)
            .await?;

        Ok(FetchOutcome::Stored { key })
    }
}
