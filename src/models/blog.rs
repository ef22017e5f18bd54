use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blog {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub feed_url: Option<String>,
    pub scrape_selector: Option<String>,
    pub last_scanned: Option<DateTime<Utc>>,
}

/// A blog as entered by the user, before storage assigns it an id.
#[derive(Debug, Clone, Default)]
pub struct NewBlog {
    pub name: String,
    pub url: String,
    pub feed_url: Option<String>,
    pub scrape_selector: Option<String>,
}

impl NewBlog {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_feed_url(mut self, feed_url: Option<String>) -> Self {
        self.feed_url = feed_url;
        self
    }

    pub fn with_scrape_selector(mut self, selector: Option<String>) -> Self {
        self.scrape_selector = selector;
        self
    }
}
