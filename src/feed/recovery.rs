use std::borrow::Cow;

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};

use crate::models::CandidateArticle;

const CDATA_START: &[u8] = b"<![CDATA[";
const CDATA_END: &[u8] = b"]]>";

/// Replace `&` that does not start an entity or character reference with
/// `&amp;`. CDATA sections are copied untouched and non-XML input (JSON Feed)
/// is returned as is.
pub(super) fn escape_stray_ampersands(bytes: &[u8]) -> Cow<'_, [u8]> {
    let is_markup = bytes
        .strip_prefix(b"\xEF\xBB\xBF")
        .unwrap_or(bytes)
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        == Some(&b'<');
    if !is_markup || !bytes.contains(&b'&') {
        return Cow::Borrowed(bytes);
    }

    let mut out = Vec::with_capacity(bytes.len() + 16);
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i..].starts_with(CDATA_START) {
            let end = find(&bytes[i..], CDATA_END)
                .map(|pos| i + pos + CDATA_END.len())
                .unwrap_or(bytes.len());
            out.extend_from_slice(&bytes[i..end]);
            i = end;
            continue;
        }

        if bytes[i] == b'&' && !starts_reference(&bytes[i + 1..]) {
            out.extend_from_slice(b"&amp;");
        } else {
            out.push(bytes[i]);
        }
        i += 1;
    }

    Cow::Owned(out)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Whether the bytes after a `&` form `name;`, `#123;` or `#x1F;`.
fn starts_reference(rest: &[u8]) -> bool {
    let Some(end) = rest.iter().take(32).position(|&b| b == b';') else {
        return false;
    };

    match &rest[..end] {
        [b'#', b'x' | b'X', hex @ ..] => !hex.is_empty() && hex.iter().all(u8::is_ascii_hexdigit),
        [b'#', digits @ ..] => !digits.is_empty() && digits.iter().all(u8::is_ascii_digit),
        [first, tail @ ..] => {
            (first.is_ascii_alphabetic() || *first == b'_')
                && tail
                    .iter()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_'))
        }
        [] => false,
    }
}

/// Lenient pass over a feed the XML parser rejected. The markup is read with
/// an HTML parser, which closes unterminated elements and ignores stray end
/// tags, and every `item`/`entry` element is read for title, link and date.
pub(super) fn recover_entries(bytes: &[u8]) -> Vec<CandidateArticle> {
    let text = String::from_utf8_lossy(bytes);
    let document = Html::parse_document(&text);
    let Ok(selector) = Selector::parse("item, entry") else {
        return Vec::new();
    };

    document.select(&selector).filter_map(recover_entry).collect()
}

fn recover_entry(entry: ElementRef<'_>) -> Option<CandidateArticle> {
    let mut title = String::new();
    let mut url = None;
    let mut published = None;
    let mut updated = None;

    for child in entry.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "title" if title.is_empty() => title = element_text(child),
            "link" if url.is_none() => url = link_target(child),
            "pubdate" | "published" if published.is_none() => {
                published = parse_date(&element_text(child));
            }
            "updated" if updated.is_none() => updated = parse_date(&element_text(child)),
            _ => {}
        }
    }

    let url = url.filter(|u| !u.is_empty())?;
    if title.is_empty() {
        return None;
    }

    Some(CandidateArticle {
        title,
        url,
        published_at: published.or(updated),
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Atom links carry the target in `href`. An RSS `<link>` is a void element
/// to the HTML parser, so its URL ends up in the following text node.
fn link_target(link: ElementRef<'_>) -> Option<String> {
    if let Some(href) = link.value().attr("href") {
        return match link.value().attr("rel") {
            None | Some("alternate") => Some(href.trim().to_string()),
            Some(_) => None,
        };
    }

    link.next_sibling()
        .and_then(|node| node.value().as_text().map(|t| t.trim().to_string()))
}

fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_rfc2822(value))
        .ok()
        .map(|d| d.with_timezone(&Utc))
}
