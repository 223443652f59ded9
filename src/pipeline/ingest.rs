// src/pipeline/ingest.rs

//! Trending image ingestion pipeline.
//!
//! Walks the feed page by page and hands every post to a fetch-and-store
//! worker. Pages are requested strictly in order; workers run concurrently
//! with later page requests and with each other, bounded by a semaphore.
//! When every permit is taken the paginator waits for one before scheduling
//! the next post, so a saturated pool also delays the next page request.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::models::{CandidatePost, Config, FeedConfig, FeedQuery, FetchOutcome, IngestReport};
use crate::services::{FeedSource, HttpDownloader, ImageFetcher, RedditFeed};
use crate::storage::BlobStore;
use crate::utils::AllowList;

/// Parameters of one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Feed subject (subreddit)
    pub subreddit: String,
    /// Maximum number of page requests
    pub max_pages: usize,
    /// Posts requested per page; a shorter page ends the run
    pub page_size: usize,
    /// Ranking window for the listing
    pub time_window: String,
}

impl IngestOptions {
    pub fn from_config(feed: &FeedConfig) -> Self {
        Self {
            subreddit: feed.subreddit.clone(),
            max_pages: feed.max_pages,
            page_size: feed.page_size,
            time_window: feed.time_window.clone(),
        }
    }
}

type WorkerResult = (String, Result<FetchOutcome>);

/// Feed paginator with a bounded fetch-and-store worker pool.
pub struct Ingestor {
    feed: Arc<dyn FeedSource>,
    fetcher: Arc<ImageFetcher>,
    max_concurrent: usize,
}

impl Ingestor {
    pub fn new(feed: Arc<dyn FeedSource>, fetcher: ImageFetcher, max_concurrent: usize) -> Self {
        Self {
            feed,
            fetcher: Arc::new(fetcher),
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Wire up the Reddit feed and HTTP downloader from configuration.
    pub fn from_config(config: &Config, client: Client, store: Arc<dyn BlobStore>) -> Result<Self> {
        let allow_list = AllowList::new(&config.feed.allowed_domains)?;
        let feed = RedditFeed::new(client.clone(), config.feed.base_url.clone());
        let fetcher = ImageFetcher::new(
            Arc::new(HttpDownloader::new(client)),
            store,
            allow_list,
            config.storage.bucket.clone(),
        );

        Ok(Self::new(
            Arc::new(feed),
            fetcher,
            config.crawler.max_concurrent,
        ))
    }

    /// Fetch up to `max_pages` pages and store every allowed image.
    ///
    /// A failed page request aborts the run (in-flight workers are dropped
    /// with it). Individual worker failures are counted in the report and
    /// never fail the run. Cancelling `cancel` stops every worker. If that
    /// interrupts a feed request or the wait for a worker slot, the run
    /// returns [`AppError::Cancelled`]; once every page has been scheduled,
    /// the run still returns its report with the stopped workers counted as
    /// `cancelled`.
    pub async fn run(&self, options: &IngestOptions, cancel: &CancellationToken) -> Result<IngestReport> {
        let mut report = IngestReport::new(&options.subreddit);
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut workers: JoinSet<WorkerResult> = JoinSet::new();
        let mut cursor: Option<String> = None;

        log::info!(
            "Ingesting r/{} (max {} pages of {}, {} workers)",
            options.subreddit,
            options.max_pages,
            options.page_size,
            self.max_concurrent
        );

        for page_num in 1..=options.max_pages {
            let query = FeedQuery {
                subject: options.subreddit.clone(),
                limit: options.page_size,
                after: cursor.clone(),
                time_window: options.time_window.clone(),
            };

            let page = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AppError::Cancelled),
                page = self.feed.top_posts(&query) => page?,
            };

            report.pages_fetched += 1;
            let page_len = page.posts.len();
            log::info!("Page {}: {} posts", page_num, page_len);

            for post in page.posts {
                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(AppError::Cancelled),
                    permit = Arc::clone(&semaphore).acquire_owned() => {
                        permit.map_err(|_| AppError::Cancelled)?
                    }
                };

                while let Some(joined) = workers.try_join_next() {
                    record(&mut report, joined);
                }

                report.posts_seen += 1;
                let fetcher = Arc::clone(&self.fetcher);
                let token = cancel.child_token();
                workers.spawn(async move {
                    let _permit = permit;
                    run_worker(&fetcher, post, &token).await
                });
            }

            if page_len < options.page_size {
                log::debug!("Short page ({} < {}), end of results", page_len, options.page_size);
                break;
            }

            match page.next_cursor {
                Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                _ => {
                    log::debug!("Feed cursor did not advance, stopping after page {}", page_num);
                    break;
                }
            }
        }

        while let Some(joined) = workers.join_next().await {
            record(&mut report, joined);
        }
        report.finished_at = Utc::now();

        if report.cancelled > 0 {
            log::warn!(
                "Ingestion cut short: {} worker(s) cancelled after {} stored",
                report.cancelled,
                report.stored
            );
        }

        log::info!(
            "Ingestion of r/{} finished: {} pages, {} posts, {} stored, {} skipped, {} failed, {} cancelled",
            report.subreddit,
            report.pages_fetched,
            report.posts_seen,
            report.stored,
            report.skipped,
            report.failed,
            report.cancelled
        );

        Ok(report)
    }

    /// Run with a deadline; when it passes the run is cancelled.
    pub async fn run_with_deadline(&self, options: &IngestOptions, deadline: Duration) -> Result<IngestReport> {
        let cancel = CancellationToken::new();
        let run = self.run(options, &cancel);
        tokio::pin!(run);

        tokio::select! {
            result = &mut run => result,
            _ = tokio::time::sleep(deadline) => {
                log::warn!("Ingestion deadline of {:?} reached, cancelling", deadline);
                cancel.cancel();
                run.await
            }
        }
    }
}

async fn run_worker(fetcher: &ImageFetcher, post: CandidatePost, cancel: &CancellationToken) -> WorkerResult {
    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::Cancelled),
        outcome = fetcher.fetch_and_store(&post) => outcome,
    };
    (post.id, outcome)
}

fn record(report: &mut IngestReport, joined: std::result::Result<WorkerResult, JoinError>) {
    match joined {
        Ok((_, Ok(FetchOutcome::Stored { key }))) => {
            report.stored += 1;
            log::debug!("Stored {}", key);
        }
        Ok((_, Ok(FetchOutcome::Skipped))) => report.skipped += 1,
        Ok((_, Err(AppError::Cancelled))) => report.cancelled += 1,
        Ok((post_id, Err(error))) => {
            report.failed += 1;
            log::warn!("Failed to ingest post {}: {}", post_id, error);
        }
        Err(error) => {
            report.failed += 1;
            log::error!("Ingest worker did not complete: {}", error);
        }
    }
}
