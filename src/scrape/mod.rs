mod page;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::CandidateArticle;

pub use page::PageScraper;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScrapeError {
    #[error("Failed to fetch page: {0}")]
    Fetch(String),

    #[error("Invalid selector '{0}'")]
    InvalidSelector(String),
}

/// Where the scanner gets scraped links from when a blog has no usable feed.
#[async_trait]
pub trait ScrapeSource: Send + Sync {
    async fn scrape(
        &self,
        page_url: &str,
        selector: &str,
    ) -> Result<Vec<CandidateArticle>, ScrapeError>;
}
