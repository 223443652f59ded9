//! Republish request message.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Inbound request to upload a stored image to the image host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepublishRequest {
    /// Storage key of the image
    pub key: String,

    /// Bucket holding the image
    pub bucket: String,

    /// Classification label attached upstream; carried through untouched
    #[serde(default)]
    pub prediction: String,
}

impl RepublishRequest {
    /// Decode a request from a JSON message body.
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }
}
