// src/models/mod.rs

//! Domain models shared by the ingestion and republish pipelines.

mod config;
mod post;
mod report;
mod republish;

// Re-export all public types
pub use config::{Config, CrawlerConfig, FeedConfig, ImgurConfig, IngestConfig, StorageConfig};
pub use post::{CandidatePost, FeedPage, FeedQuery};
pub use report::{FetchOutcome, IngestReport, RepublishOutcome};
pub use republish::RepublishRequest;
