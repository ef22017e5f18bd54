use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub blog_id: i64,
    pub title: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub discovered_at: DateTime<Utc>,
    pub is_read: bool,
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub blog_id: i64,
    pub title: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub discovered_at: DateTime<Utc>,
}

impl NewArticle {
    pub fn from_candidate(
        blog_id: i64,
        candidate: CandidateArticle,
        discovered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            blog_id,
            title: candidate.title,
            url: candidate.url,
            published_at: candidate.published_at,
            discovered_at,
        }
    }
}

/// An article found by a feed or scrape pass that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateArticle {
    pub title: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl CandidateArticle {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            published_at: None,
        }
    }
}
