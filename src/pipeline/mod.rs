//! Pipeline entry points.
//!
//! - `Ingestor`: page through the feed and store allowed images
//! - `Republisher`: upload a stored image to the image host

pub mod ingest;
pub mod republish;

pub use ingest::{IngestOptions, Ingestor};
pub use republish::Republisher;
