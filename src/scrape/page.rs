use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{ScrapeError, ScrapeSource};
use crate::models::CandidateArticle;

pub struct PageScraper {
    client: Client,
}

impl PageScraper {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ScrapeSource for PageScraper {
    async fn scrape(
        &self,
        page_url: &str,
        selector: &str,
    ) -> Result<Vec<CandidateArticle>, ScrapeError> {
        let base = Url::parse(page_url).map_err(|e| ScrapeError::Fetch(e.to_string()))?;
        Selector::parse(selector).map_err(|_| ScrapeError::InvalidSelector(selector.to_string()))?;

        let response = self
            .client
            .get(base.as_str())
            .send()
            .await
            .map_err(|e| ScrapeError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ScrapeError::Fetch(format!("HTTP {}", response.status())));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ScrapeError::Fetch(e.to_string()))?;

        let candidates = extract_candidates(&html, &base, selector)?;
        tracing::debug!(
            "Scraped {} links from {} with '{}'",
            candidates.len(),
            page_url,
            selector
        );
        Ok(candidates)
    }
}

/// Extract article links from a page.
///
/// Each element matched by `selector` contributes its own anchor, or its
/// first descendant anchor. Hrefs are resolved against `base` and the first
/// occurrence of each resolved URL wins.
pub fn extract_candidates(
    html: &str,
    base: &Url,
    selector: &str,
) -> Result<Vec<CandidateArticle>, ScrapeError> {
    let selector =
        Selector::parse(selector).map_err(|_| ScrapeError::InvalidSelector(selector.to_string()))?;
    let document = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for element in document.select(&selector) {
        let Some(anchor) = find_anchor(element) else {
            continue;
        };

        let href = anchor.value().attr("href").unwrap_or("").trim();
        if href.is_empty() {
            continue;
        }

        let Ok(url) = base.join(href) else {
            continue;
        };
        let url = url.to_string();

        if !seen.insert(url.clone()) {
            continue;
        }

        let Some(title) = extract_title(anchor, element) else {
            continue;
        };

        candidates.push(CandidateArticle::new(title, url));
    }

    Ok(candidates)
}

fn find_anchor(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    if is_anchor(element) {
        return Some(element);
    }

    element
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|e| is_anchor(*e))
}

fn is_anchor(element: ElementRef<'_>) -> bool {
    element.value().name().eq_ignore_ascii_case("a")
}

/// Anchor text, then the anchor's title attribute, then the matched
/// element's text when it is not the anchor itself.
fn extract_title(anchor: ElementRef<'_>, element: ElementRef<'_>) -> Option<String> {
    let text = text_of(anchor);
    if !text.is_empty() {
        return Some(text);
    }

    let title = anchor.value().attr("title").unwrap_or("").trim();
    if !title.is_empty() {
        return Some(title.to_string());
    }

    if element.id() != anchor.id() {
        let text = text_of(element);
        if !text.is_empty() {
            return Some(text);
        }
    }

    None
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
