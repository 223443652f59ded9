//! Local filesystem blob storage.
//!
//! Development and test counterpart of the S3 backend. Each bucket is a
//! directory under the root:
//!
//! ```text
//! {root}/
//! └── ra-reddit-images/
//!     ├── 1abcde.png
//!     └── 1fghij.jpeg
//! ```

use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::BlobStore;

/// Suffix source for temp files, so concurrent writers of one key never share one.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root_dir: PathBuf,
}

impl LocalBlobStore {
    /// Create a new LocalBlobStore rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Resolve `(bucket, key)` to a path inside the root.
    fn path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        for part in [bucket, key] {
            let relative = Path::new(part);
            let plain = !part.is_empty()
                && relative
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)));
            if !plain {
                return Err(AppError::validation(format!(
                    "Invalid storage location: {bucket}/{key}"
                )));
            }
        }
        Ok(self.root_dir.join(bucket).join(key))
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(format!(".{}.{}.tmp", std::process::id(), seq));
        let tmp = PathBuf::from(tmp_name);

        let result = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(bytes).await?;
            file.flush().await?;
            drop(file);
            tokio::fs::rename(&tmp, path).await
        }
        .await;

        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let path = self.path(bucket, key)?;
        Self::write_bytes(&path, &bytes).await?;
        log::debug!(
            "Stored {} bytes ({}) at {}",
            bytes.len(),
            content_type,
            path.display()
        );
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::not_found(bucket, key))
            }
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let store = LocalBlobStore::new(tmp.path());

        store
            .put("images", "abc.png", b"hello".to_vec(), "image/png")
            .await
            .unwrap();
        let data = store.get("images", "abc.png").await.unwrap();
        assert_eq!(data, b"hello".to_vec());
        assert!(tmp.path().join("images").join("abc.png").exists());
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let store = LocalBlobStore::new(tmp.path());

        let err = store.get("images", "nope.png").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let tmp = TempDir::new().unwrap();
        let store = LocalBlobStore::new(tmp.path());

        store
            .put("images", "abc.png", b"first".to_vec(), "image/png")
            .await
            .unwrap();
        store
            .put("images", "abc.png", b"second".to_vec(), "image/png")
            .await
            .unwrap();

        assert_eq!(store.get("images", "abc.png").await.unwrap(), b"second");
        let entries = std::fs::read_dir(tmp.path().join("images")).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_puts_to_same_key() {
        let tmp = TempDir::new().unwrap();
        let store = LocalBlobStore::new(tmp.path());

        for round in 0..20 {
            let mut writers = tokio::task::JoinSet::new();
            for writer in 0..8u8 {
                let store = store.clone();
                writers.spawn(async move {
                    store
                        .put("images", "dup.png", vec![writer; 64], "image/png")
                        .await
                });
            }
            while let Some(joined) = writers.join_next().await {
                assert!(joined.unwrap().is_ok(), "round {round}");
            }
        }

        let data = store.get("images", "dup.png").await.unwrap();
        assert_eq!(data.len(), 64);
        assert!(data.iter().all(|b| *b == data[0]));
        let entries = std::fs::read_dir(tmp.path().join("images")).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let tmp = TempDir::new().unwrap();
        let store = LocalBlobStore::new(tmp.path());

        for (bucket, key) in [("images", "../x.png"), ("..", "x.png"), ("images", "/etc/x"), ("", "x")] {
            let result = store.put(bucket, key, b"x".to_vec(), "image/png").await;
            assert!(matches!(result, Err(AppError::Validation(_))), "{bucket}/{key}");
        }
    }
}
