use std::time::Duration;

use async_trait::async_trait;
use feed_rs::model::{Entry, Link};
use feed_rs::parser;
use reqwest::Client;
use url::Url;

use super::discovery::{common_feed_urls, find_feed_link};
use super::recovery::{escape_stray_ampersands, recover_entries};
use super::{FeedError, FeedSource};
use crate::models::CandidateArticle;

pub struct FeedFetcher {
    client: Client,
    probe_timeout: Duration,
}

impl FeedFetcher {
    pub fn new(client: Client, probe_timeout: Duration) -> Self {
        Self {
            client,
            probe_timeout,
        }
    }

    /// Fetch a page body as text, failing on transport errors and non-2xx
    /// responses.
    async fn fetch_page(&self, url: &Url) -> std::result::Result<String, String> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }

        response.text().await.map_err(|e| e.to_string())
    }

    /// Check whether a URL serves something that parses as a feed with at
    /// least one entry or a feed-level title.
    async fn is_valid_feed(&self, url: &Url) -> bool {
        let response = match self
            .client
            .get(url.as_str())
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Probe of {} failed: {}", url, e);
                return false;
            }
        };

        if !response.status().is_success() {
            return false;
        }

        let Ok(bytes) = response.bytes().await else {
            return false;
        };

        match parser::parse(&escape_stray_ampersands(&bytes)[..]) {
            Ok(feed) => !feed.entries.is_empty() || feed.title.is_some(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl FeedSource for FeedFetcher {
    async fn fetch_feed(&self, feed_url: &str) -> Result<Vec<CandidateArticle>, FeedError> {
        let response = self
            .client
            .get(feed_url)
            .send()
            .await
            .map_err(|e| FeedError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FeedError::Fetch(format!("HTTP {}", response.status())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FeedError::Fetch(e.to_string()))?;

        let candidates = parse_entries(&bytes)?;
        tracing::debug!("Parsed {} entries from {}", candidates.len(), feed_url);
        Ok(candidates)
    }

    async fn discover_feed_url(&self, blog_url: &str) -> Option<String> {
        let base = match Url::parse(blog_url) {
            Ok(base) => base,
            Err(e) => {
                tracing::debug!("Cannot discover feed for {}: {}", blog_url, e);
                return None;
            }
        };

        let html = match self.fetch_page(&base).await {
            Ok(html) => html,
            Err(e) => {
                tracing::debug!("Feed discovery fetch of {} failed: {}", blog_url, e);
                return None;
            }
        };

        if let Some(feed_url) = find_feed_link(&html, &base) {
            tracing::debug!("Found feed link {} on {}", feed_url, blog_url);
            return Some(feed_url);
        }

        for candidate in common_feed_urls(&base) {
            if self.is_valid_feed(&candidate).await {
                tracing::debug!("Found feed at conventional path {}", candidate);
                return Some(candidate.to_string());
            }
        }

        None
    }
}

/// Parse raw feed bytes (RSS, Atom or JSON Feed) into candidates.
///
/// Entries without a non-empty title or link are skipped. Malformed XML is
/// only an error when no entries can be recovered from it.
pub fn parse_entries(bytes: &[u8]) -> Result<Vec<CandidateArticle>, FeedError> {
    let bytes = escape_stray_ampersands(bytes);

    let feed = match parser::parse(&bytes[..]) {
        Ok(feed) => feed,
        Err(e) => {
            let recovered = recover_entries(&bytes);
            if recovered.is_empty() {
                return Err(FeedError::Parse(e.to_string()));
            }
            tracing::debug!(
                "Feed is malformed ({}), recovered {} entries",
                e,
                recovered.len()
            );
            return Ok(recovered);
        }
    };

    let total = feed.entries.len();
    let candidates: Vec<CandidateArticle> = feed
        .entries
        .into_iter()
        .filter_map(candidate_from_entry)
        .collect();
    if candidates.len() < total {
        tracing::debug!(
            "Skipped {} of {} entries without a title or link",
            total - candidates.len(),
            total
        );
    }

    Ok(candidates)
}

fn candidate_from_entry(entry: Entry) -> Option<CandidateArticle> {
    let title = entry
        .title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .unwrap_or_default();
    let url = entry_link(&entry.links).unwrap_or_default();

    if title.is_empty() || url.is_empty() {
        return None;
    }

    Some(CandidateArticle {
        title,
        url,
        // feed-rs has no separate created timestamp
        published_at: entry.published.or(entry.updated),
    })
}

fn entry_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .map(|l| l.href.trim().to_string())
}
