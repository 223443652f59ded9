//! imgrelay CLI
//!
//! Local execution entry point. For AWS Lambda, use `imgrelay-ingest-lambda`
//! and `imgrelay-republish-lambda`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use imgrelay::{
    error::Result,
    models::{Config, RepublishRequest},
    pipeline::{IngestOptions, Ingestor, Republisher},
    storage::{BlobStore, LocalBlobStore},
    utils::http,
};
use tokio_util::sync::CancellationToken;

/// imgrelay - trending image relay
#[derive(Parser, Debug)]
#[command(
    name = "imgrelay",
    version,
    about = "Collect trending subreddit images and republish them to Imgur"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "imgrelay.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch trending posts and store their images
    Ingest {
        /// Subreddit to read (overrides config)
        #[arg(long)]
        subreddit: Option<String>,

        /// Maximum number of feed pages (overrides config)
        #[arg(long)]
        pages: Option<usize>,

        /// Store in S3 instead of the local storage directory
        #[cfg(feature = "s3")]
        #[arg(long)]
        s3: bool,
    },

    /// Upload a stored image to Imgur
    Republish {
        /// Storage key of the image
        #[arg(long)]
        key: String,

        /// Bucket holding the image (default: configured bucket)
        #[arg(long)]
        bucket: Option<String>,

        /// Classification label to carry along
        #[arg(long, default_value = "")]
        prediction: String,

        /// Read from S3 instead of the local storage directory
        #[cfg(feature = "s3")]
        #[arg(long)]
        s3: bool,
    },

    /// Validate configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn local_store(config: &Config) -> Arc<dyn BlobStore> {
    log::info!("Using local storage at {}", config.storage.local_root);
    Arc::new(LocalBlobStore::new(&config.storage.local_root))
}

#[cfg(feature = "s3")]
async fn open_store(config: &Config, use_s3: bool) -> Arc<dyn BlobStore> {
    if use_s3 {
        log::info!("Using S3 storage");
        return Arc::new(imgrelay::storage::S3BlobStore::from_env().await);
    }
    local_store(config)
}

#[cfg(not(feature = "s3"))]
async fn open_store(config: &Config, _use_s3: bool) -> Arc<dyn BlobStore> {
    local_store(config)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    config.apply_env();
    log::info!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Ingest {
            subreddit,
            pages,
            #[cfg(feature = "s3")]
            s3,
        } => {
            #[cfg(not(feature = "s3"))]
            let s3 = false;

            if let Some(subreddit) = subreddit {
                config.feed.subreddit = subreddit;
            }
            if let Some(pages) = pages {
                config.feed.max_pages = pages;
            }
            config.validate()?;

            let client = http::create_async_client(&config.crawler)?;
            let store = open_store(&config, s3).await;
            let ingestor = Ingestor::from_config(&config, client, store)?;
            let options = IngestOptions::from_config(&config.feed);

            let cancel = CancellationToken::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("Interrupted, cancelling ingestion...");
                    ctrl_c.cancel();
                }
            });

            let report = ingestor.run(&options, &cancel).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Republish {
            key,
            bucket,
            prediction,
            #[cfg(feature = "s3")]
            s3,
        } => {
            #[cfg(not(feature = "s3"))]
            let s3 = false;

            let client = http::create_async_client(&config.crawler)?;
            let store = open_store(&config, s3).await;
            let republisher = Republisher::from_config(&config, client, store)?;

            let request = RepublishRequest {
                key,
                bucket: bucket.unwrap_or_else(|| config.storage.bucket.clone()),
                prediction,
            };
            let link = republisher.republish(&request).await?;
            println!("{link}");
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            if config.imgur.client_id.is_empty() {
                log::warn!("Imgur client id is not set; republish will fail");
            }

            log::info!("All validations passed!");
        }
    }

    Ok(())
}
