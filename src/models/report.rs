// src/models/report.rs

//! Run outcome summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a single fetch-and-store worker did with its post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Image written under this key
    Stored { key: String },
    /// URL not on the allow list; nothing downloaded
    Skipped,
}

/// Aggregated outcome of one ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub subreddit: String,
    pub pages_fetched: usize,
    /// Posts returned by the feed, i.e. worker tasks scheduled
    pub posts_seen: usize,
    pub stored: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Workers stopped by cancellation before finishing
    #[serde(default)]
    pub cancelled: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl IngestReport {
    pub fn new(subreddit: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            subreddit: subreddit.into(),
            pages_fetched: 0,
            posts_seen: 0,
            stored: 0,
            skipped: 0,
            failed: 0,
            cancelled: 0,
            started_at: now,
            finished_at: now,
        }
    }

    /// Number of worker results recorded so far.
    pub fn completed(&self) -> usize {
        self.stored + self.skipped + self.failed + self.cancelled
    }
}

/// Result of handling one republish delivery.
///
/// Returned to the invoker as JSON; the handler never fails the delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RepublishOutcome {
    Published { link: String },
    Malformed { reason: String },
    Failed { reason: String },
    /// Delivery carried no records
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_counts_every_result() {
        let mut report = IngestReport::new("Konosuba");
        report.stored = 3;
        report.skipped = 2;
        report.failed = 1;
        report.cancelled = 4;
        assert_eq!(report.completed(), 10);
    }

    #[test]
    fn test_republish_outcome_json() {
        let outcome = RepublishOutcome::Published {
            link: "https://i.imgur.com/abc.png".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&outcome).unwrap(),
            r#"{"status":"published","link":"https://i.imgur.com/abc.png"}"#
        );
        assert_eq!(
            serde_json::to_string(&RepublishOutcome::Empty).unwrap(),
            r#"{"status":"empty"}"#
        );
    }
}
