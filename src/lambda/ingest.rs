// src/lambda/ingest.rs

//! Ingestion trigger.
//!
//! Invoked through an API Gateway proxy integration. The request body is
//! ignored; the run is driven entirely by environment configuration.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use lambda_runtime::{Error as LambdaError, LambdaEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::error::Result;
use crate::models::{Config, IngestReport};
use crate::pipeline::{IngestOptions, Ingestor};
use crate::storage::s3::S3BlobStore;
use crate::utils::http::create_async_client;

/// API Gateway proxy response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Time kept back from the invocation deadline to send the response.
const RESPONSE_MARGIN: Duration = Duration::from_secs(5);

impl ApiGatewayResponse {
    fn ok(report: &IngestReport) -> Result<Self> {
        Ok(Self {
            status_code: 200,
            body: Some(serde_json::to_string(report)?),
        })
    }

    fn error(message: &str) -> Self {
        Self {
            status_code: 500,
            body: Some(serde_json::json!({ "error": message }).to_string()),
        }
    }
}

/// Lambda handler for ingestion runs.
#[instrument(skip(event))]
pub async fn handler(event: LambdaEvent<Value>) -> std::result::Result<ApiGatewayResponse, LambdaError> {
    let start = Instant::now();
    info!("Ingestion triggered (request {})", event.context.request_id);
    // A zero deadline means the runtime did not report one.
    let invocation_deadline = (event.context.deadline > 0)
        .then(|| UNIX_EPOCH + Duration::from_millis(event.context.deadline));

    match run_ingest(invocation_deadline).await.and_then(|report| {
        let response = ApiGatewayResponse::ok(&report)?;
        Ok((report, response))
    }) {
        Ok((report, response)) => {
            info!(
                "Ingestion completed: {} stored, {} skipped, {} failed, {} cancelled in {}ms",
                report.stored,
                report.skipped,
                report.failed,
                report.cancelled,
                start.elapsed().as_millis()
            );
            Ok(response)
        }
        Err(e) => {
            error!("Ingestion failed: {}", e);
            Ok(ApiGatewayResponse::error(&e.to_string()))
        }
    }
}

/// Run budget: the configured timeout, capped by the time left in the invocation.
fn run_budget(configured: Duration, invocation_deadline: Option<SystemTime>, now: SystemTime) -> Duration {
    let Some(deadline) = invocation_deadline else {
        return configured;
    };
    let remaining = deadline
        .duration_since(now)
        .unwrap_or_default()
        .saturating_sub(RESPONSE_MARGIN);
    configured.min(remaining)
}

async fn run_ingest(invocation_deadline: Option<SystemTime>) -> Result<IngestReport> {
    let config = Config::from_env();
    config.validate()?;

    let client = create_async_client(&config.crawler)?;
    let store = Arc::new(S3BlobStore::from_env().await);
    let ingestor = Ingestor::from_config(&config, client, store)?;

    let budget = run_budget(
        Duration::from_secs(config.ingest.timeout_secs),
        invocation_deadline,
        SystemTime::now(),
    );
    info!("Ingestion budget: {:?}", budget);

    let options = IngestOptions::from_config(&config.feed);
    ingestor.run_with_deadline(&options, budget).await
}
