// src/pipeline/republish.rs

//! Republish pipeline: stored image to public image host.
//!
//! Handling is best-effort. Decode, retrieval and upload failures are logged
//! and reported as a [`RepublishOutcome`], never retried.

use std::sync::Arc;

use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{Config, RepublishOutcome, RepublishRequest};
use crate::services::{ImageHost, ImgurClient};
use crate::storage::BlobStore;

/// Uploads stored images to the image host.
pub struct Republisher {
    store: Arc<dyn BlobStore>,
    host: Arc<dyn ImageHost>,
    album: Option<String>,
}

impl Republisher {
    pub fn new(store: Arc<dyn BlobStore>, host: Arc<dyn ImageHost>, album: Option<String>) -> Self {
        Self {
            store,
            host,
            album: album.filter(|a| !a.trim().is_empty()),
        }
    }

    /// Build an Imgur-backed republisher.
    ///
    /// Fails with [`AppError::NotConfigured`] without an Imgur client id.
    pub fn from_config(config: &Config, client: Client, store: Arc<dyn BlobStore>) -> Result<Self> {
        let host = ImgurClient::from_config(client, &config.imgur)?;
        let album = config.imgur.album().map(str::to_string);
        Ok(Self::new(store, Arc::new(host), album))
    }

    /// Read `request.key` from `request.bucket` and upload it, returning the public link.
    ///
    /// Storage is only read.
    pub async fn republish(&self, request: &RepublishRequest) -> Result<String> {
        log::info!(
            "Republishing s3://{}/{} (prediction: {:?})",
            request.bucket,
            request.key,
            request.prediction
        );

        let image = self.store.get(&request.bucket, &request.key).await?;
        let link = self.host.upload(image, self.album.as_deref()).await?;

        log::info!("Republished {} as {}", request.key, link);
        Ok(link)
    }

    /// Decode and handle one message body.
    pub async fn handle_message(&self, body: &str) -> RepublishOutcome {
        let request = match RepublishRequest::from_json(body) {
            Ok(request) => request,
            Err(e) => {
                log::warn!("Dropping malformed republish message: {}", e);
                return RepublishOutcome::Malformed {
                    reason: e.to_string(),
                };
            }
        };

        match self.republish(&request).await {
            Ok(link) => RepublishOutcome::Published { link },
            Err(e) => {
                log::error!("Failed to republish {}: {}", request.key, e);
                RepublishOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Handle a delivery batch. Only the first record is processed.
    pub async fn handle_batch<'a, I>(&self, bodies: I) -> RepublishOutcome
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut bodies = bodies.into_iter();
        let Some(first) = bodies.next() else {
            log::warn!("Republish delivery contained no records");
            return RepublishOutcome::Empty;
        };

        let ignored = bodies.count();
        if ignored > 0 {
            log::warn!("Ignoring {} additional record(s) in republish delivery", ignored);
        }

        self.handle_message(first).await
    }
}

/// Outcome for a delivery that could not be handled at all.
pub fn failed_outcome(error: &AppError) -> RepublishOutcome {
    RepublishOutcome::Failed {
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::Ordering;

    use async_trait::async_trait;

    use super::*;
    use crate::services::fetch::tests::MemoryStore;

    /// Image host recording every upload.
    #[derive(Default)]
    struct RecordingHost {
        uploads: Mutex<Vec<(Vec<u8>, Option<String>)>>,
        reject: bool,
    }

    #[async_trait]
    impl ImageHost for RecordingHost {
        async fn upload(&self, image: Vec<u8>, album: Option<&str>) -> Result<String> {
            if self.reject {
                return Err(AppError::upload(400, "bad image"));
            }
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push((image, album.map(str::to_string)));
            Ok(format!("https://i.imgur.com/up{}.png", uploads.len()))
        }
    }

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::default());
        store
            .put("images", "abc.png", b"png-bytes".to_vec(), "image/png")
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_republish_uploads_stored_bytes() {
        let store = seeded_store().await;
        let host = Arc::new(RecordingHost::default());
        let republisher = Republisher::new(
            Arc::clone(&store) as Arc<dyn BlobStore>,
            Arc::clone(&host) as Arc<dyn ImageHost>,
            Some("album1".to_string()),
        );

        let request = RepublishRequest {
            key: "abc.png".to_string(),
            bucket: "images".to_string(),
            prediction: "megumin".to_string(),
        };
        let link = republisher.republish(&request).await.unwrap();

        assert_eq!(link, "https://i.imgur.com/up1.png");
        let uploads = host.uploads.lock().unwrap();
        assert_eq!(uploads[0].0, b"png-bytes");
        assert_eq!(uploads[0].1.as_deref(), Some("album1"));
        // read-only: only the seeding put happened
        assert_eq!(store.puts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_blank_album_is_ungrouped() {
        let store = seeded_store().await;
        let host = Arc::new(RecordingHost::default());
        let republisher = Republisher::new(store, Arc::clone(&host) as Arc<dyn ImageHost>, Some("  ".to_string()));

        let outcome = republisher
            .handle_message(r#"{"key": "abc.png", "bucket": "images"}"#)
            .await;

        assert!(matches!(outcome, RepublishOutcome::Published { .. }));
        assert_eq!(host.uploads.lock().unwrap()[0].1, None);
    }

    #[tokio::test]
    async fn test_malformed_message_is_not_an_error() {
        let host = Arc::new(RecordingHost::default());
        let republisher = Republisher::new(seeded_store().await, Arc::clone(&host) as Arc<dyn ImageHost>, None);

        let outcome = republisher.handle_message("{not json").await;

        assert!(matches!(outcome, RepublishOutcome::Malformed { .. }));
        assert!(host.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_object_fails() {
        let host = Arc::new(RecordingHost::default());
        let republisher = Republisher::new(seeded_store().await, Arc::clone(&host) as Arc<dyn ImageHost>, None);

        let outcome = republisher
            .handle_message(r#"{"key": "gone.png", "bucket": "images"}"#)
            .await;

        match outcome {
            RepublishOutcome::Failed { reason } => assert!(reason.contains("gone.png")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(host.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_rejection_fails() {
        let host = Arc::new(RecordingHost {
            reject: true,
            ..Default::default()
        });
        let republisher = Republisher::new(seeded_store().await, host, None);

        let outcome = republisher
            .handle_message(r#"{"key": "abc.png", "bucket": "images"}"#)
            .await;

        match outcome {
            RepublishOutcome::Failed { reason } => {
                assert!(reason.contains("400"));
                assert!(reason.contains("bad image"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_batch_processes_first_record_only() {
        let host = Arc::new(RecordingHost::default());
        let republisher = Republisher::new(seeded_store().await, Arc::clone(&host) as Arc<dyn ImageHost>, None);

        let bodies = [
            r#"{"key": "abc.png", "bucket": "images"}"#,
            r#"{"key": "abc.png", "bucket": "images"}"#,
            "garbage",
        ];
        let outcome = republisher.handle_batch(bodies).await;

        assert!(matches!(outcome, RepublishOutcome::Published { .. }));
        assert_eq!(host.uploads.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let republisher = Republisher::new(seeded_store().await, Arc::new(RecordingHost::default()), None);
        assert_eq!(republisher.handle_batch([]).await, RepublishOutcome::Empty);
    }

    #[test]
    fn test_from_config_requires_client_id() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::default());
        let result = Republisher::from_config(&Config::default(), Client::new(), store);
        assert!(matches!(result, Err(AppError::NotConfigured(_))));
    }
}
