mod discovery;
mod fetcher;
mod recovery;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::CandidateArticle;

pub use fetcher::FeedFetcher;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("Failed to fetch feed: {0}")]
    Fetch(String),

    #[error("Failed to parse feed: {0}")]
    Parse(String),
}

/// Where the scanner gets feed entries from.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch a feed and normalize its entries into candidates, in feed order.
    async fn fetch_feed(&self, feed_url: &str) -> Result<Vec<CandidateArticle>, FeedError>;

    /// Best-effort lookup of a feed URL for a blog homepage. Network
    /// failures yield `None`.
    async fn discover_feed_url(&self, blog_url: &str) -> Option<String>;
}
