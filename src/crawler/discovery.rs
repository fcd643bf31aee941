//! Sitemap and changelog discovery
//!
//! Before the first batch, each seed origin's sitemaps are read and the
//! documentation pages they list are queued at top priority. After the last
//! batch, a handful of well-known changelog locations are tried. Every
//! request goes through the fetcher, so it is guarded and rate limited.

use crate::crawler::fetcher::Fetcher;
use crate::crawler::outcome::FetchStatus;
use crate::extract::{changelog_entries, changelog_text, ChangelogEntry, MAX_CHANGELOG_ENTRIES};
use crate::robots::{fetch_rules, RobotsCache};
use crate::url::{
    is_binary_path, is_documentation_path, is_skipped_path, normalize_url, same_origin,
};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info};
use url::Url;

/// Tried when robots.txt names no sitemap
pub const WELL_KNOWN_SITEMAPS: &[&str] =
    &["/sitemap.xml", "/sitemap-0.xml", "/sitemap_index.xml"];

/// Most sitemap files fetched per origin, index children included
const MAX_SITEMAP_FETCHES: usize = 10;

/// Changelog bodies this short are error or placeholder pages
const MIN_CHANGELOG_LEN: usize = 200;

static LOC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<loc>\s*(.*?)\s*</loc>").expect("sitemap loc regex is valid") // Static pattern, safe to panic
});

/// A changelog found for one of the seed origins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundChangelog {
    pub url: Url,
    pub entries: Vec<ChangelogEntry>,
}

/// `<loc>` values of a `<urlset>` or `<sitemapindex>` document, unescaped
pub fn sitemap_locations(xml: &str) -> Vec<String> {
    LOC_PATTERN
        .captures_iter(xml)
        .filter_map(|captures| captures.get(1))
        .map(|loc| unescape_xml(loc.as_str()))
        .filter(|loc| !loc.is_empty())
        .collect()
}

/// Returns true if the document lists sitemaps rather than pages
pub fn is_sitemap_index(xml: &str) -> bool {
    xml.to_ascii_lowercase().contains("<sitemapindex")
}

/// Keeps the documentation pages on `origin` from a sitemap's locations
///
/// Skip-listed and binary paths are dropped. A page is kept when its path
/// looks like documentation or ends in `/`, `.md`, `.html` or `.htm`.
pub fn filter_doc_urls(locations: &[String], origin: &Url) -> Vec<Url> {
    let mut seen = HashSet::new();
    locations
        .iter()
        .filter_map(|location| {
            let parsed = Url::parse(location).ok()?;
            let path = parsed.path().to_lowercase();
            if is_skipped_path(&path) || is_binary_path(&path) {
                return None;
            }

            let doc_like = is_documentation_path(&path)
                || path.ends_with('/')
                || path.ends_with(".md")
                || path.ends_with(".html")
                || path.ends_with(".htm");
            if !doc_like {
                return None;
            }

            let normalized = normalize_url(location).ok()?;
            same_origin(origin, &normalized).then_some(normalized)
        })
        .filter(|url| seen.insert(url.as_str().to_string()))
        .collect()
}

/// Where a project's release notes usually live
///
/// For a GitHub repository URL the repository's releases page and
/// `CHANGELOG.md` come first.
pub fn changelog_candidates(seed: &Url) -> Vec<Url> {
    let mut paths = Vec::new();

    if seed.host_str() == Some("github.com") {
        let parts: Vec<&str> = seed
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).take(2).collect())
            .unwrap_or_default();
        if let [owner, repo] = parts.as_slice() {
            paths.push(format!("/{}/{}/releases", owner, repo));
            paths.push(format!("/{}/{}/blob/main/CHANGELOG.md", owner, repo));
            paths.push(format!("/{}/{}/blob/master/CHANGELOG.md", owner, repo));
        }
    }

    paths.extend(
        [
            "/changelog",
            "/CHANGELOG",
            "/CHANGELOG.md",
            "/releases",
            "/docs/changelog",
            "/docs/releases",
            "/whats-new",
            "/blog/releases",
        ]
        .iter()
        .map(|p| p.to_string()),
    );

    paths.iter().filter_map(|p| seed.join(p).ok()).collect()
}

/// Documentation URLs listed in the sitemaps of `origin`, at most `limit`
///
/// `origin` may be any URL on the site; only its origin matters. Sitemaps
/// named in robots.txt are used when there are any, otherwise the
/// well-known locations. Sitemap indexes are followed one level deep.
pub async fn discover_sitemap_urls(
    fetcher: &Fetcher,
    robots: Option<&RobotsCache>,
    origin: &Url,
    limit: usize,
) -> Vec<Url> {
    if limit == 0 {
        return Vec::new();
    }

    let listed = match robots {
        Some(robots) => robots.sitemaps(fetcher, origin).await,
        None => {
            fetch_rules(fetcher, &origin.origin().ascii_serialization())
                .await
                .sitemaps()
        }
    };

    let mut pending: Vec<(Url, bool)> = if listed.is_empty() {
        WELL_KNOWN_SITEMAPS
            .iter()
            .filter_map(|path| origin.join(path).ok())
            .map(|url| (url, true))
            .collect()
    } else {
        listed
            .iter()
            .filter_map(|raw| Url::parse(raw).ok())
            .map(|url| (url, true))
            .collect()
    };
    pending.reverse();

    let mut fetched = HashSet::new();
    let mut found: Vec<Url> = Vec::new();
    let mut known = HashSet::new();

    while let Some((sitemap_url, may_descend)) = pending.pop() {
        if found.len() >= limit || fetched.len() >= MAX_SITEMAP_FETCHES {
            break;
        }
        if !fetched.insert(sitemap_url.as_str().to_string()) {
            continue;
        }

        let outcome = fetcher.fetch_plain(&sitemap_url).await;
        let (FetchStatus::Ok { .. }, Some(body)) = (&outcome.status, outcome.body.as_deref())
        else {
            debug!(sitemap = %sitemap_url, status = outcome.status.label(), "No sitemap");
            continue;
        };

        let locations = sitemap_locations(body);
        if is_sitemap_index(body) {
            if may_descend {
                // Children go to the front so an index is read depth first
                for child in locations.iter().rev().filter_map(|l| Url::parse(l).ok()) {
                    pending.push((child, false));
                }
            }
            continue;
        }

        let pages = filter_doc_urls(&locations, origin);
        debug!(
            sitemap = %sitemap_url,
            listed = locations.len(),
            docs = pages.len(),
            "Read sitemap"
        );
        for page in pages {
            if found.len() >= limit {
                break;
            }
            if known.insert(page.as_str().to_string()) {
                found.push(page);
            }
        }
    }

    if !found.is_empty() {
        info!(origin = %origin, urls = found.len(), "Sitemap discovery");
    }
    found
}

/// Tries up to `limit` changelog locations for `seed`, stopping at the first
/// one that yields release entries
pub async fn find_changelog(
    fetcher: &Fetcher,
    robots: Option<&RobotsCache>,
    seed: &Url,
    limit: usize,
) -> Option<FoundChangelog> {
    for candidate in changelog_candidates(seed).into_iter().take(limit) {
        if let Some(robots) = robots {
            if !robots.is_allowed(fetcher, &candidate).await {
                continue;
            }
        }

        let outcome = fetcher.fetch_plain(&candidate).await;
        let (FetchStatus::Ok { .. }, Some(body)) = (&outcome.status, outcome.body.as_deref())
        else {
            continue;
        };
        if body.chars().count() <= MIN_CHANGELOG_LEN {
            continue;
        }

        let page_url = outcome
            .final_url
            .as_deref()
            .and_then(|u| Url::parse(u).ok())
            .unwrap_or_else(|| candidate.clone());
        let entries = changelog_entries(&changelog_text(body, &page_url), MAX_CHANGELOG_ENTRIES);
        if !entries.is_empty() {
            info!(url = %candidate, entries = entries.len(), "Found changelog");
            return Some(FoundChangelog {
                url: candidate,
                entries,
            });
        }
    }

    None
}

fn unescape_xml(text: &str) -> String {
    text.trim()
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://docs.example.com").unwrap()
    }

    #[test]
    fn test_sitemap_locations() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://docs.example.com/docs/intro</loc></url>
  <url><LOC>
    https://docs.example.com/guide/setup?lang=en&amp;v=2
  </LOC></url>
  <url><loc></loc></url>
</urlset>"#;

        assert_eq!(
            sitemap_locations(xml),
            vec![
                "https://docs.example.com/docs/intro",
                "https://docs.example.com/guide/setup?lang=en&v=2"
            ]
        );
        assert!(!is_sitemap_index(xml));
    }

    #[test]
    fn test_sitemap_index_detection() {
        let xml = r#"<sitemapindex><sitemap><loc>https://docs.example.com/a.xml</loc></sitemap></sitemapindex>"#;
        assert!(is_sitemap_index(xml));
        assert_eq!(sitemap_locations(xml), vec!["https://docs.example.com/a.xml"]);
    }

    #[test]
    fn test_filter_doc_urls() {
        let locations: Vec<String> = [
            "https://docs.example.com/docs/intro",
            "https://docs.example.com/docs/intro#top",
            "https://docs.example.com/getting-started.html",
            "https://docs.example.com/README.md",
            "https://docs.example.com/",
            "https://docs.example.com/pricing",
            "https://docs.example.com/blog/launch/",
            "https://docs.example.com/docs/manual.pdf",
            "https://docs.example.com/careers",
            "https://docs.example.com/team",
            "https://other.example.com/docs/intro",
            "not a url",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let kept: Vec<String> = filter_doc_urls(&locations, &origin())
            .iter()
            .map(|u| u.to_string())
            .collect();

        assert_eq!(
            kept,
            vec![
                "https://docs.example.com/docs/intro",
                "https://docs.example.com/getting-started.html",
                "https://docs.example.com/README.md",
                "https://docs.example.com/",
            ]
        );
    }

    #[test]
    fn test_changelog_candidates() {
        let candidates = changelog_candidates(&origin());
        assert_eq!(candidates[0].as_str(), "https://docs.example.com/changelog");
        assert_eq!(candidates.len(), 8);
    }

    #[test]
    fn test_github_changelog_candidates_come_first() {
        let seed = Url::parse("https://github.com/honojs/hono/tree/main/docs").unwrap();
        let candidates: Vec<String> = changelog_candidates(&seed)
            .iter()
            .map(|u| u.to_string())
            .collect();

        assert_eq!(candidates[0], "https://github.com/honojs/hono/releases");
        assert_eq!(
            candidates[1],
            "https://github.com/honojs/hono/blob/main/CHANGELOG.md"
        );
        assert_eq!(candidates[3], "https://github.com/changelog");
        assert_eq!(candidates.len(), 11);
    }

    #[test]
    fn test_unescape_xml() {
        assert_eq!(unescape_xml(" a&amp;lt;b "), "a&lt;b");
        assert_eq!(unescape_xml("x&amp;y&quot;"), "x&y\"");
    }
}
