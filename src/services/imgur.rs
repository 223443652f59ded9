// src/services/imgur.rs

//! Imgur image upload client.
//!
//! Uploads are anonymous (`Authorization: Client-ID <id>`) multipart posts to
//! `{base}/image`. The API answers with a JSON envelope:
//!
//! ```json
//! {"data": {"id": "abc", "link": "https://i.imgur.com/abc.png", "deletehash": "..."},
//!  "success": true, "status": 200}
//! ```
//!
//! On failure `data.error` holds either a plain string or an object with a
//! `message` field.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::ImgurConfig;

/// Default Imgur API base URL.
pub const IMGUR_DEFAULT_API_BASE_URL: &str = "https://api.imgur.com/3/";

/// File name sent with the image part.
const UPLOAD_FILE_NAME: &str = "img";

/// Longest slice of a non-JSON error body kept in the error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// External host that republished images are uploaded to.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload raw image bytes, optionally into an album, returning the public link.
    async fn upload(&self, image: Vec<u8>, album: Option<&str>) -> Result<String>;
}

/// Imgur API client.
#[derive(Clone)]
pub struct ImgurClient {
    client: Client,
    client_id: String,
    upload_url: Url,
}

impl std::fmt::Debug for ImgurClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImgurClient")
            .field("client_id", &"<redacted>")
            .field("upload_url", &self.upload_url.as_str())
            .finish()
    }
}

impl ImgurClient {
    /// Create a client for the given credential.
    ///
    /// Fails with [`AppError::NotConfigured`] if `client_id` is empty.
    pub fn new(client: Client, client_id: impl Into<String>, base_url: &str) -> Result<Self> {
        let client_id = client_id.into();
        if client_id.trim().is_empty() {
            return Err(AppError::not_configured("Imgur client"));
        }

        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let upload_url = Url::parse(&base)?.join("image")?;

        Ok(Self {
            client,
            client_id: client_id.trim().to_string(),
            upload_url,
        })
    }

    /// Create a client from the `[imgur]` configuration section.
    pub fn from_config(client: Client, config: &ImgurConfig) -> Result<Self> {
        Self::new(client, config.client_id.clone(), &config.base_url)
    }

    pub fn upload_url(&self) -> &Url {
        &self.upload_url
    }
}

#[async_trait]
impl ImageHost for ImgurClient {
    async fn upload(&self, image: Vec<u8>, album: Option<&str>) -> Result<String> {
        let size = image.len();
        let mut form = Form::new().part("image", Part::bytes(image).file_name(UPLOAD_FILE_NAME));
        if let Some(album) = album.map(str::trim).filter(|a| !a.is_empty()) {
            form = form.text("album", album.to_string());
        }

        log::debug!("Uploading {} bytes to {}", size, self.upload_url);

        let response = self
            .client
            .post(self.upload_url.clone())
            .header(AUTHORIZATION, format!("Client-ID {}", self.client_id))
            .multipart(form)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;

        parse_upload_response(status, &body)
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    data: UploadData,
}

#[derive(Deserialize, Default)]
struct UploadData {
    #[serde(default)]
    link: String,
    #[serde(default)]
    error: Option<HostError>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HostError {
    Message(String),
    Detailed { message: String },
    Other(serde_json::Value),
}

impl HostError {
    fn into_message(self) -> String {
        match self {
            Self::Message(message) | Self::Detailed { message } => message,
            Self::Other(value) => value.to_string(),
        }
    }
}

/// Interpret an upload response body, returning the image link on success.
///
/// `http_status` is used when the envelope carries no `status` of its own.
pub fn parse_upload_response(http_status: u16, body: &[u8]) -> Result<String> {
    let response: UploadResponse = match serde_json::from_slice(body) {
        Ok(response) => response,
        Err(e) if !(200..300).contains(&http_status) => {
            let text: String = String::from_utf8_lossy(body)
                .chars()
                .take(MAX_ERROR_BODY_CHARS)
                .collect();
            log::debug!("Non-JSON upload response ({}): {}", http_status, e);
            return Err(AppError::upload(http_status, text.trim()));
        }
        Err(e) => return Err(e.into()),
    };

    let status = response.status.unwrap_or(http_status);

    if !response.success {
        let message = response
            .data
            .error
            .map(HostError::into_message)
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(AppError::upload(status, message));
    }

    if response.data.link.is_empty() {
        return Err(AppError::upload(status, "response did not include a link"));
    }

    Ok(response.data.link)
}
