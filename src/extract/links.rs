//! Outbound link extraction
//!
//! Only links that stay on the page's host and look like further
//! documentation survive. Results are normalized and deduplicated in
//! document order.

use crate::url::{
    is_binary_path, is_documentation_path, is_skipped_path, normalize_url, same_origin,
};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracts documentation links from `document`
///
/// # Link Rules
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - links to another host or port
/// - the page itself, including fragment-only and query-only variants
/// - skip-listed sections (blog, pricing, login, ...) and binary downloads
///
/// **Keep** the rest when the path is documentation-like or shares the
/// page's top-level section.
pub fn extract_links(document: &Html, page_url: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let page = normalize_url(page_url.as_str()).unwrap_or_else(|_| page_url.clone());
    let section = top_level_section(page.path());

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        if element.value().attr("download").is_some() {
            continue;
        }

        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(link) = resolve_link(href, &page) else {
            continue;
        };

        if !same_origin(&page, &link) || link.path() == page.path() {
            continue;
        }

        let path = link.path();
        if is_skipped_path(path) || is_binary_path(path) {
            continue;
        }

        let in_section = section.is_some() && top_level_section(path) == section;
        if !(is_documentation_path(path) || in_section) {
            continue;
        }

        if seen.insert(link.as_str().to_string()) {
            links.push(link.to_string());
        }
    }

    links
}

/// Resolves an href against the page and normalizes it
///
/// Returns None for special schemes, fragment-only links and anything that
/// does not normalize to an HTTP(S) URL.
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    normalize_url(absolute.as_str()).ok()
}

/// First non-empty path segment, lowercased
fn top_level_section(path: &str) -> Option<String> {
    path.split('/')
        .find(|segment| !segment.is_empty())
        .map(|segment| segment.to_lowercase())
}
