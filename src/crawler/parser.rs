//! Outbound link extraction
//!
//! # Link Extraction Rules
//!
//! **Include:**
//! - `<a href="...">` and `<area href="...">`
//! - `<link rel="canonical" href="...">`
//!
//! **Exclude:**
//! - `<a href="..." download>`
//! - `javascript:`, `mailto:`, `tel:` and `data:` links
//! - Fragment-only links
//! - Anything that does not resolve to http(s)
//!
//! Relative links resolve against `<base href>` when the page declares one,
//! otherwise against the page URL. Link order follows the document and
//! duplicates are dropped. Restricting links to the hidden network is the
//! scheduler's job, not this module's.

use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Extracts absolute outbound links from an HTML page
///
/// # Example
///
/// ```
/// use darkline::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<a href="/vendor/1">v</a><a href="mailto:x@y.onion">m</a>"#;
/// let base = Url::parse("http://market.onion/").unwrap();
/// assert_eq!(extract_links(html, &base), vec!["http://market.onion/vendor/1"]);
/// ```
pub fn extract_links(html: &str, page_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let base = document_base(&document, page_url);

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let selectors = ["a[href], area[href]", "link[rel='canonical'][href]"];
    for selector in selectors.iter().filter_map(|s| Selector::parse(s).ok()) {
        for element in document.select(&selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            let Some(href) = element.value().attr("href") else {
                continue;
            };

            if let Some(absolute) = resolve_link(href, &base) {
                if seen.insert(absolute.clone()) {
                    links.push(absolute);
                }
            }
        }
    }

    links
}

/// The `<base href>` of the document resolved against the page URL
fn document_base(document: &Html, page_url: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .and_then(|element| element.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or_else(|| page_url.clone())
}

/// Resolves a link href to an absolute http(s) URL
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if SKIPPED_SCHEMES.iter().any(|scheme| lowered.starts_with(scheme)) {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }

    absolute.set_fragment(None);
    Some(absolute.to_string())
}
