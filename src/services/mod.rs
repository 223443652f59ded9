//! Service layer for the ingestion and republish pipelines.
//!
//! This module contains the external-facing clients:
//! - Trending post listings (`FeedSource`, `RedditFeed`)
//! - Image download and storage (`ImageFetcher`)
//! - Image host uploads (`ImageHost`, `ImgurClient`)

pub mod feed;
pub mod fetch;
pub mod imgur;

pub use feed::{FeedSource, RedditFeed};
pub use fetch::{Download, HttpDownloader, ImageDownloader, ImageFetcher};
pub use imgur::{ImageHost, ImgurClient};
