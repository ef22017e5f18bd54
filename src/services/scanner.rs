use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::feed::FeedSource;
use crate::models::{Blog, CandidateArticle, NewArticle, ScanError, ScanResult, ScanSource};
use crate::scrape::ScrapeSource;

/// Candidates gathered for one blog, before dedup and storage.
struct Collected {
    candidates: Vec<CandidateArticle>,
    source: ScanSource,
    error: Option<ScanError>,
}

/// A finished scan. `failure` holds the storage error, if any, that the
/// result row also reports.
struct ScanOutcome {
    result: ScanResult,
    failure: Option<AppError>,
}

pub struct Scanner {
    repository: Arc<Repository>,
    feeds: Arc<dyn FeedSource>,
    scraper: Arc<dyn ScrapeSource>,
}

impl Scanner {
    pub fn new(
        repository: Arc<Repository>,
        feeds: Arc<dyn FeedSource>,
        scraper: Arc<dyn ScrapeSource>,
    ) -> Self {
        Self {
            repository,
            feeds,
            scraper,
        }
    }

    /// Scan every tracked blog in name order. A blog whose scan fails still
    /// gets a result row and does not stop the others.
    pub async fn scan_all_blogs(&self) -> Result<Vec<ScanResult>> {
        let blogs = self.repository.list_blogs().await?;
        let mut results = Vec::with_capacity(blogs.len());

        for blog in &blogs {
            let outcome = self.run_scan(blog).await;
            if let Some(e) = &outcome.failure {
                tracing::error!("Scan of {} failed: {}", blog.name, e);
            }
            results.push(outcome.result);
        }

        Ok(results)
    }

    /// Returns `None` when no blog has that name.
    pub async fn scan_blog_by_name(&self, name: &str) -> Result<Option<ScanResult>> {
        let Some(blog) = self.repository.find_blog_by_name(name).await? else {
            return Ok(None);
        };

        self.scan_blog(&blog).await.map(Some)
    }

    /// Scan a single blog: pick a source, store the articles not seen before
    /// and stamp the blog as scanned.
    ///
    /// Feed and scrape failures are reported in the result; only storage
    /// failures are returned as errors.
    pub async fn scan_blog(&self, blog: &Blog) -> Result<ScanResult> {
        let outcome = self.run_scan(blog).await;
        match outcome.failure {
            Some(e) => Err(e),
            None => Ok(outcome.result),
        }
    }

    async fn run_scan(&self, blog: &Blog) -> ScanOutcome {
        let feed_url = self.effective_feed_url(blog).await;
        let collected = self.collect_candidates(blog, feed_url.as_deref()).await;

        let unique = dedup_by_url(collected.candidates);
        let total_found = unique.len();

        let stored = self.store_new_articles(blog.id, unique).await;
        let scanned = self
            .repository
            .update_blog_last_scanned(blog.id, Utc::now())
            .await;

        let mut result = ScanResult {
            blog_name: blog.name.clone(),
            new_articles: 0,
            total_found,
            source: collected.source,
            error: collected.error,
        };

        match stored.and_then(|inserted| scanned.map(|()| inserted)) {
            Ok(inserted) => {
                result.new_articles = inserted;
                match &result.error {
                    Some(e) => tracing::warn!("{}: {}", blog.name, e),
                    None => tracing::info!(
                        "{}: {} new of {} found via {}",
                        blog.name,
                        inserted,
                        total_found,
                        result.source
                    ),
                }
                ScanOutcome {
                    result,
                    failure: None,
                }
            }
            Err(e) => {
                result.error = Some(ScanError::Storage(e.to_string()));
                ScanOutcome {
                    result,
                    failure: Some(e),
                }
            }
        }
    }

    /// The stored feed URL, or one found by discovery. A discovered URL is
    /// saved onto the blog so later scans skip discovery.
    async fn effective_feed_url(&self, blog: &Blog) -> Option<String> {
        if let Some(feed_url) = non_empty(blog.feed_url.as_deref()) {
            return Some(feed_url.to_string());
        }

        let discovered = self.feeds.discover_feed_url(&blog.url).await?;
        tracing::info!("Discovered feed {} for {}", discovered, blog.name);

        let updated = Blog {
            feed_url: Some(discovered.clone()),
            ..blog.clone()
        };
        if let Err(e) = self.repository.update_blog(&updated).await {
            tracing::warn!("Could not save discovered feed for {}: {}", blog.name, e);
        }

        Some(discovered)
    }

    async fn collect_candidates(&self, blog: &Blog, feed_url: Option<&str>) -> Collected {
        let mut candidates = Vec::new();
        let mut source = ScanSource::None;
        let mut feed_error = None;

        if let Some(feed_url) = feed_url {
            match self.feeds.fetch_feed(feed_url).await {
                Ok(items) => {
                    candidates = items;
                    source = ScanSource::Rss;
                }
                Err(e) => {
                    tracing::debug!("Feed {} failed: {}", feed_url, e);
                    feed_error = Some(e);
                }
            }
        }

        let mut error = feed_error.clone().map(ScanError::Feed);

        if candidates.is_empty() {
            if let Some(selector) = non_empty(blog.scrape_selector.as_deref()) {
                match self.scraper.scrape(&blog.url, selector).await {
                    Ok(items) => {
                        candidates = items;
                        source = ScanSource::Scraper;
                        error = None;
                    }
                    Err(scrape) => {
                        error = Some(ScanError::Scrape {
                            feed: feed_error,
                            scrape,
                        });
                    }
                }
            }
        }

        Collected {
            candidates,
            source,
            error,
        }
    }

    /// Drop candidates already stored under any blog and insert the rest.
    /// Returns the number of rows written.
    async fn store_new_articles(
        &self,
        blog_id: i64,
        candidates: Vec<CandidateArticle>,
    ) -> Result<usize> {
        let existing = self
            .repository
            .existing_urls(candidates.iter().map(|c| c.url.clone()).collect())
            .await?;

        let discovered_at = Utc::now();
        let new_articles: Vec<NewArticle> = candidates
            .into_iter()
            .filter(|c| !existing.contains(&c.url))
            .map(|c| NewArticle::from_candidate(blog_id, c, discovered_at))
            .collect();

        self.repository.bulk_insert_articles(new_articles).await
    }
}

/// Keep the first candidate for each URL.
fn dedup_by_url(candidates: Vec<CandidateArticle>) -> Vec<CandidateArticle> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.url.clone()))
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
