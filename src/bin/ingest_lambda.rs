//! AWS Lambda entry point for imgrelay ingest
//!
//! Runs one ingestion pass per invocation (API Gateway or scheduled trigger).
//! Deploy with `cargo lambda build --release --features lambda`.

use imgrelay::lambda::ingest::handler;
use lambda_runtime::{Error as LambdaError, service_fn};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the AWS Lambda function.
#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    // `init` also installs the log-to-tracing bridge for library records.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("imgrelay ingest Lambda starting...");
    lambda_runtime::run(service_fn(handler)).await
}
