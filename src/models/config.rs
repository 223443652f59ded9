//! Application configuration structures.

use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::utils::AllowList;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Feed traversal settings
    #[serde(default)]
    pub feed: FeedConfig,

    /// Blob storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Image host credentials
    #[serde(default)]
    pub imgur: ImgurConfig,

    /// Ingestion run limits
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Build configuration from defaults plus process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| env::var(name).ok());
    }

    /// Override values from an arbitrary variable lookup.
    ///
    /// Numeric variables that fail to parse are ignored with a warning.
    pub fn apply_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("IMGUR_CLIENT_ID") {
            self.imgur.client_id = v;
        }
        if let Some(v) = lookup("ALBUM_HASH") {
            self.imgur.album_hash = v;
        }
        if let Some(v) = lookup("REDDIT_IMAGES_BUCKET") {
            self.storage.bucket = v;
        }
        if let Some(v) = lookup("SUBREDDIT") {
            self.feed.subreddit = v;
        }

        parse_var(&lookup, "CRAWL_TIMEOUT_SECS", &mut self.crawler.timeout_secs);
        parse_var(&lookup, "MAX_CONCURRENT", &mut self.crawler.max_concurrent);
        parse_var(&lookup, "MAX_PAGES", &mut self.feed.max_pages);
        parse_var(&lookup, "PAGE_SIZE", &mut self.feed.page_size);
        parse_var(&lookup, "INGEST_TIMEOUT_SECS", &mut self.ingest.timeout_secs);
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.feed.subreddit.trim().is_empty() {
            return Err(AppError::validation("feed.subreddit is empty"));
        }
        if self.feed.max_pages == 0 {
            return Err(AppError::validation("feed.max_pages must be > 0"));
        }
        if self.feed.page_size == 0 {
            return Err(AppError::validation("feed.page_size must be > 0"));
        }
        if self.feed.allowed_domains.is_empty() {
            return Err(AppError::validation("No allowed image domains defined"));
        }
        AllowList::new(&self.feed.allowed_domains)
            .map_err(|e| AppError::validation(format!("Invalid allowed domains: {e}")))?;
        if self.storage.bucket.trim().is_empty() {
            return Err(AppError::validation("storage.bucket is empty"));
        }
        if self.ingest.timeout_secs == 0 {
            return Err(AppError::validation("ingest.timeout_secs must be > 0"));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(name) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => log::warn!("Ignoring {name}={raw:?}: not a valid number"),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum concurrent image downloads
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Feed traversal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Subreddit to read top posts from
    #[serde(default = "defaults::subreddit")]
    pub subreddit: String,

    /// Upper bound on page requests per run
    #[serde(default = "defaults::max_pages")]
    pub max_pages: usize,

    /// Posts requested per page
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,

    /// Ranking window for "top" listings
    #[serde(default = "defaults::time_window")]
    pub time_window: String,

    /// Base URL of the listing API
    #[serde(default = "defaults::reddit_base_url")]
    pub base_url: String,

    /// URL prefixes an image must live under to be downloaded
    #[serde(default = "defaults::allowed_domains")]
    pub allowed_domains: Vec<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            subreddit: defaults::subreddit(),
            max_pages: defaults::max_pages(),
            page_size: defaults::page_size(),
            time_window: defaults::time_window(),
            base_url: defaults::reddit_base_url(),
            allowed_domains: defaults::allowed_domains(),
        }
    }
}

/// Blob storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Destination bucket for ingested images
    #[serde(default = "defaults::bucket")]
    pub bucket: String,

    /// Root directory for the local filesystem backend
    #[serde(default = "defaults::local_root")]
    pub local_root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: defaults::bucket(),
            local_root: defaults::local_root(),
        }
    }
}

/// Imgur API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImgurConfig {
    /// Application client ID; empty means not configured
    #[serde(default)]
    pub client_id: String,

    /// Album to group uploads under; empty uploads ungrouped
    #[serde(default)]
    pub album_hash: String,

    /// API base URL, ending in a slash
    #[serde(default = "defaults::imgur_base_url")]
    pub base_url: String,
}

impl ImgurConfig {
    /// Album reference, if one is configured.
    pub fn album(&self) -> Option<&str> {
        let album = self.album_hash.trim();
        (!album.is_empty()).then_some(album)
    }
}

impl Default for ImgurConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            album_hash: String::new(),
            base_url: defaults::imgur_base_url(),
        }
    }
}

/// Limits for a single ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Deadline for the whole run, in seconds
    #[serde(default = "defaults::ingest_timeout")]
    pub timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::ingest_timeout(),
        }
    }
}

mod defaults {
    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; imgrelay/1.0)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_concurrent() -> usize {
        16
    }

    // Feed defaults
    pub fn subreddit() -> String {
        "Konosuba".into()
    }
    pub fn max_pages() -> usize {
        2
    }
    pub fn page_size() -> usize {
        100
    }
    pub fn time_window() -> String {
        "day".into()
    }
    pub fn reddit_base_url() -> String {
        "https://www.reddit.com".into()
    }
    pub fn allowed_domains() -> Vec<String> {
        vec!["https://i.redd.it/".into(), "https://i.imgur.com/".into()]
    }

    // Storage defaults
    pub fn bucket() -> String {
        "ra-reddit-images".into()
    }
    pub fn local_root() -> String {
        "storage".into()
    }

    pub fn imgur_base_url() -> String {
        crate::services::imgur::IMGUR_DEFAULT_API_BASE_URL.into()
    }

    pub fn ingest_timeout() -> u64 {
        600
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.crawler.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unparseable_domain() {
        let mut config = Config::default();
        config.feed.allowed_domains = vec!["i.redd.it".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_hostless_domain() {
        for domain in ["mailto:x", "file:///x"] {
            let mut config = Config::default();
            config.feed.allowed_domains = vec![domain.to_string()];
            assert!(matches!(config.validate(), Err(AppError::Validation(_))), "{domain}");
        }
    }

    #[test]
    fn env_overrides_apply() {
        let env = vars(&[
            ("IMGUR_CLIENT_ID", "abc123"),
            ("ALBUM_HASH", "album1"),
            ("REDDIT_IMAGES_BUCKET", "my-bucket"),
            ("SUBREDDIT", "aww"),
            ("MAX_CONCURRENT", "4"),
            ("PAGE_SIZE", "50"),
        ]);
        let mut config = Config::default();
        config.apply_vars(|name| env.get(name).cloned());

        assert_eq!(config.imgur.client_id, "abc123");
        assert_eq!(config.imgur.album(), Some("album1"));
        assert_eq!(config.storage.bucket, "my-bucket");
        assert_eq!(config.feed.subreddit, "aww");
        assert_eq!(config.crawler.max_concurrent, 4);
        assert_eq!(config.feed.page_size, 50);
        assert_eq!(config.feed.max_pages, 2);
    }

    #[test]
    fn bad_numeric_override_is_ignored() {
        let env = vars(&[("MAX_PAGES", "lots")]);
        let mut config = Config::default();
        config.apply_vars(|name| env.get(name).cloned());
        assert_eq!(config.feed.max_pages, 2);
    }

    #[test]
    fn empty_album_is_none() {
        let config = ImgurConfig::default();
        assert_eq!(config.album(), None);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [feed]
            subreddit = "EarthPorn"
            max_pages = 3

            [imgur]
            album_hash = "xyz"
            "#,
        )
        .unwrap();

        assert_eq!(config.feed.subreddit, "EarthPorn");
        assert_eq!(config.feed.max_pages, 3);
        assert_eq!(config.feed.page_size, 100);
        assert_eq!(config.imgur.base_url, "https://api.imgur.com/3/");
        assert_eq!(config.storage.bucket, "ra-reddit-images");
    }
}
