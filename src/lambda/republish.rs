// src/lambda/republish.rs

//! Republish trigger.
//!
//! Invoked by an SQS event source. Each delivery is handled once: the handler
//! always succeeds and reports what happened in its [`RepublishOutcome`], so
//! the queue never redelivers.

use std::sync::Arc;

use lambda_runtime::{Error as LambdaError, LambdaEvent};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use crate::error::Result;
use crate::models::{Config, RepublishOutcome};
use crate::pipeline::Republisher;
use crate::pipeline::republish::failed_outcome;
use crate::storage::s3::S3BlobStore;
use crate::utils::http::create_async_client;

/// SQS event delivery.
#[derive(Debug, Default, Deserialize)]
pub struct SqsEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<SqsMessage>,
}

/// A single SQS record; only the body is used.
#[derive(Debug, Default, Deserialize)]
pub struct SqsMessage {
    #[serde(rename = "messageId", default)]
    pub message_id: Option<String>,

    #[serde(default)]
    pub body: Option<String>,
}

impl SqsEvent {
    /// Record bodies in delivery order. Records without a body read as empty.
    pub fn bodies(&self) -> impl Iterator<Item = &str> {
        self.records
            .iter()
            .map(|record| record.body.as_deref().unwrap_or_default())
    }
}

/// Lambda handler for republish deliveries.
#[instrument(skip(event))]
pub async fn handler(event: LambdaEvent<SqsEvent>) -> std::result::Result<RepublishOutcome, LambdaError> {
    let (event, _context) = event.into_parts();
    if let Some(first) = event.records.first() {
        info!("Received {} record(s), first message {:?}", event.records.len(), first.message_id);
    }

    let republisher = match build_republisher().await {
        Ok(republisher) => republisher,
        Err(e) => {
            error!("Republisher unavailable: {}", e);
            return Ok(failed_outcome(&e));
        }
    };

    let outcome = republisher.handle_batch(event.bodies()).await;
    match &outcome {
        RepublishOutcome::Published { link } => info!("Published {}", link),
        other => warn!("Republish did not publish: {:?}", other),
    }

    Ok(outcome)
}

async fn build_republisher() -> Result<Republisher> {
    let config = Config::from_env();
    let client = create_async_client(&config.crawler)?;
    let store = Arc::new(S3BlobStore::from_env().await);
    Republisher::from_config(&config, client, store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_sqs_event() {
        let event: SqsEvent = serde_json::from_str(
            r#"{
                "Records": [
                    {
                        "messageId": "059f36b4-87a3-44ab-83d2-661975830a7d",
                        "receiptHandle": "AQEBwJnKyrHigUMZj6rYigCgxlaS3SLy0a",
                        "body": "{\"key\": \"abc.png\", \"bucket\": \"ra-reddit-images\", \"prediction\": \"aqua\"}",
                        "attributes": {"ApproximateReceiveCount": "1"},
                        "eventSource": "aws:sqs"
                    },
                    {"messageId": "2", "body": "second"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(event.records.len(), 2);
        assert_eq!(event.records[0].message_id.as_deref(), Some("059f36b4-87a3-44ab-83d2-661975830a7d"));
        let bodies: Vec<_> = event.bodies().collect();
        assert!(bodies[0].contains("abc.png"));
        assert_eq!(bodies[1], "second");
    }

    #[test]
    fn test_decodes_empty_delivery() {
        let event: SqsEvent = serde_json::from_str("{}").unwrap();
        assert_eq!(event.bodies().count(), 0);
    }
}
