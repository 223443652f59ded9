// src/services/feed.rs

//! Trending post listings.
//!
//! Reads the public Reddit "top" listing for a subreddit, one page at a
//! time. The listing envelope looks like:
//!
//! ```json
//! {"kind": "Listing", "data": {"after": "t3_1abcd", "children": [
//!     {"kind": "t3", "data": {"id": "1abcd", "url": "https://i.redd.it/x.png"}}
//! ]}}
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{CandidatePost, FeedPage, FeedQuery};

/// Paginated source of candidate posts.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch one page of top posts.
    async fn top_posts(&self, query: &FeedQuery) -> Result<FeedPage>;
}

/// Reddit listing reader over the public JSON endpoints.
#[derive(Clone)]
pub struct RedditFeed {
    client: Client,
    base_url: String,
}

impl RedditFeed {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Build `{base}/r/{subject}/top.json?...` for a query.
    fn listing_url(&self, query: &FeedQuery) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| AppError::config(format!("Invalid feed base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["r", query.subject.as_str(), "top.json"]);

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("limit", &query.limit.to_string());
            pairs.append_pair("t", &query.time_window);
            pairs.append_pair("raw_json", "1");
            if let Some(after) = &query.after {
                pairs.append_pair("after", after);
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl FeedSource for RedditFeed {
    async fn top_posts(&self, query: &FeedQuery) -> Result<FeedPage> {
        let url = self.listing_url(query)?;
        log::debug!("Requesting listing {}", url);

        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        parse_listing(&body)
    }
}

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    #[serde(default)]
    after: Option<String>,
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Deserialize)]
struct Thing {
    data: PostData,
}

#[derive(Deserialize)]
struct PostData {
    id: String,
    // Self posts have no external link; they stay in the page so its
    // length still reflects what the feed returned.
    #[serde(default)]
    url: String,
}

/// Decode a listing body into a page of candidate posts.
pub fn parse_listing(body: &[u8]) -> Result<FeedPage> {
    let listing: Listing = serde_json::from_slice(body)?;

    let posts = listing
        .data
        .children
        .into_iter()
        .map(|thing| CandidatePost::new(thing.data.id, thing.data.url))
        .collect();

    let next_cursor = listing.data.after.filter(|after| !after.is_empty());

    Ok(FeedPage { posts, next_cursor })
}
