//! Feed post data structures.

use serde::{Deserialize, Serialize};

/// A feed item that may reference an image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidatePost {
    /// Post identifier, unique within the feed
    pub id: String,

    /// Link target of the post
    pub url: String,
}

impl CandidatePost {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }

    /// Storage key for this post's image given its file extension.
    pub fn storage_key(&self, extension: &str) -> String {
        format!("{}.{}", self.id, extension)
    }
}

/// Parameters of a single "top posts" page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    /// Feed subject (subreddit name)
    pub subject: String,

    /// Maximum number of posts in the page
    pub limit: usize,

    /// Cursor to resume after; `None` starts at the top
    pub after: Option<String>,

    /// Ranking window, e.g. "day"
    pub time_window: String,
}

/// One page of feed results.
#[derive(Debug, Clone, Default)]
pub struct FeedPage {
    pub posts: Vec<CandidatePost>,

    /// Cursor for the following page, if the feed has one
    pub next_cursor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_joins_id_and_extension() {
        let post = CandidatePost::new("xyz", "https://i.redd.it/xyz.png");
        assert_eq!(post.storage_key("png"), "xyz.png");
    }
}
