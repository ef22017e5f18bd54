use std::fmt;

use serde::{Serialize, Serializer};

use crate::feed::FeedError;
use crate::scrape::ScrapeError;

/// Which path produced the candidates for a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanSource {
    Rss,
    Scraper,
    #[default]
    None,
}

impl ScanSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanSource::Rss => "rss",
            ScanSource::Scraper => "scraper",
            ScanSource::None => "none",
        }
    }
}

impl fmt::Display for ScanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a scan did not fully succeed. Both underlying causes are kept when the
/// feed and the scraper fail in the same scan.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanError {
    Feed(FeedError),
    Scrape {
        feed: Option<FeedError>,
        scrape: ScrapeError,
    },
    Storage(String),
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::Feed(err) => write!(f, "{}", err),
            ScanError::Scrape {
                feed: Some(feed),
                scrape,
            } => write!(f, "RSS: {}; Scraper: {}", feed, scrape),
            ScanError::Scrape { feed: None, scrape } => write!(f, "{}", scrape),
            ScanError::Storage(msg) => write!(f, "Storage: {}", msg),
        }
    }
}

impl std::error::Error for ScanError {}

impl Serialize for ScanError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    pub blog_name: String,
    pub new_articles: usize,
    pub total_found: usize,
    pub source: ScanSource,
    pub error: Option<ScanError>,
}
