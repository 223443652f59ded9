// src/error.rs

//! Unified error handling for the ingestion and republish pipelines.

use std::fmt;

use thiserror::Error;

/// Result type alias for imgrelay operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// AWS S3 error
    #[error("S3 error: {0}")]
    S3(String),

    /// Blob missing from storage
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A client was constructed without its credential
    #[error("{0} is not configured")]
    NotConfigured(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Image download could not be turned into a stored blob
    #[error("Download error for {url}: {message}")]
    Download { url: String, message: String },

    /// The image host rejected an upload
    #[error("error uploading image, status code: {status}, error: {message}")]
    Upload { status: u16, message: String },

    /// The surrounding run was cancelled
    #[error("Operation cancelled")]
    Cancelled,
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a "not configured" error for the named component.
    pub fn not_configured(component: impl Into<String>) -> Self {
        Self::NotConfigured(component.into())
    }

    /// Create a download error with the offending URL.
    pub fn download(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Download {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create an upload rejection error.
    pub fn upload(status: u16, message: impl Into<String>) -> Self {
        Self::Upload {
            status,
            message: message.into(),
        }
    }

    /// Create a not-found error for a blob location.
    pub fn not_found(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}
