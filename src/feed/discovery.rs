use scraper::{Html, Selector};
use url::Url;

/// `<link rel="alternate">` types that point at a feed, most preferred first.
const FEED_LINK_TYPES: [&str; 5] = [
    "application/rss+xml",
    "application/atom+xml",
    "application/feed+json",
    "application/xml",
    "text/xml",
];

/// Paths probed, in order, when a homepage advertises no feed.
const COMMON_FEED_PATHS: [&str; 8] = [
    "/feed",
    "/feed/",
    "/rss",
    "/rss/",
    "/feed.xml",
    "/rss.xml",
    "/atom.xml",
    "/index.xml",
];

/// Search an HTML page for an advertised feed link and resolve it against
/// the page URL.
pub fn find_feed_link(html: &str, base: &Url) -> Option<String> {
    let document = Html::parse_document(html);

    FEED_LINK_TYPES.iter().find_map(|mime| {
        let selector =
            Selector::parse(&format!(r#"link[rel~="alternate"][type="{}"]"#, mime)).ok()?;

        document
            .select(&selector)
            .filter_map(|link| link.value().attr("href"))
            .map(str::trim)
            .find(|href| !href.is_empty())
            .and_then(|href| base.join(href).ok())
            .map(|resolved| resolved.to_string())
    })
}

pub(super) fn common_feed_urls(base: &Url) -> impl Iterator<Item = Url> + '_ {
    COMMON_FEED_PATHS
        .iter()
        .filter_map(move |path| base.join(path).ok())
}
