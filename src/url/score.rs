//! URL scoring and path classification
//!
//! Candidate URLs carry a priority score from 1 (least useful) to 5 (API
//! reference). Scores are derived from the host and path when the caller
//! does not supply one.

use url::Url;

/// Lowest valid score
pub const SCORE_MIN: u8 = 1;
/// Highest valid score
pub const SCORE_MAX: u8 = 5;

pub const SCORE_OFFICIAL_API: u8 = 5;
pub const SCORE_OFFICIAL_GUIDE: u8 = 4;
pub const SCORE_GITHUB_README: u8 = 4;
pub const SCORE_REGISTRY: u8 = 3;
pub const SCORE_WIKI: u8 = 3;
pub const SCORE_BLOG: u8 = 2;
pub const SCORE_STACKOVERFLOW: u8 = 2;
pub const SCORE_WAYBACK: u8 = 1;
pub const SCORE_UNKNOWN: u8 = 1;
/// Documentation pages listed in a sitemap
pub const SCORE_SITEMAP_DOC: u8 = 5;

/// Path segments that mark documentation pages
pub const DOC_PATH_PATTERNS: &[&str] = &[
    "/docs/",
    "/api/",
    "/guide/",
    "/reference/",
    "/tutorial/",
    "/getting-started/",
    "/handbook/",
    "/manual/",
    "/learn/",
    "/quickstart/",
];

/// Path segments that are never documentation
pub const SKIP_PATH_PATTERNS: &[&str] = &[
    "/blog/",
    "/pricing/",
    "/login/",
    "/signup/",
    "/careers/",
    "/about/",
    "/contact/",
    "/legal/",
    "/privacy/",
    "/terms/",
    "/press/",
    "/news/",
];

/// File extensions that indicate a download rather than a page
const BINARY_EXTENSIONS: &[&str] = &[
    ".zip", ".tar.gz", ".tgz", ".exe", ".dmg", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico",
    ".pdf", ".woff", ".woff2",
];

const REGISTRY_HOSTS: &[&str] = &[
    "npmjs.com",
    "pypi.org",
    "crates.io",
    "docs.rs",
    "pkg.go.dev",
    "rubygems.org",
    "hex.pm",
];

const BLOG_HOSTS: &[&str] = &["dev.to", "medium.com", "hashnode.dev"];

/// Appends a trailing slash so `/docs` matches the `/docs/` pattern
fn slashed(path: &str) -> String {
    let path = path.to_lowercase();
    if path.ends_with('/') {
        path
    } else {
        format!("{}/", path)
    }
}

/// Returns true if any segment of the path looks like documentation
pub fn is_documentation_path(path: &str) -> bool {
    let path = slashed(path);
    DOC_PATH_PATTERNS.iter().any(|p| path.contains(p))
}

/// Returns true if the path belongs to marketing, auth or other non-doc areas
pub fn is_skipped_path(path: &str) -> bool {
    let path = slashed(path);
    SKIP_PATH_PATTERNS.iter().any(|p| path.contains(p))
}

/// Returns true if the path points at a binary download
pub fn is_binary_path(path: &str) -> bool {
    let path = path.to_lowercase();
    BINARY_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Auto-scores a URL from its host and path
///
/// # Examples
///
/// ```
/// use url::Url;
/// use doc_harvest::url::score_url;
///
/// let api = Url::parse("https://docs.stripe.com/api/charges").unwrap();
/// assert_eq!(score_url(&api), 5);
///
/// let blog = Url::parse("https://medium.com/@someone/post").unwrap();
/// assert_eq!(score_url(&blog), 2);
/// ```
pub fn score_url(url: &Url) -> u8 {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    let path = slashed(url.path());

    if path.contains("/api/") || path.contains("/reference/") {
        return SCORE_OFFICIAL_API;
    }

    if is_documentation_path(&path) {
        return SCORE_OFFICIAL_GUIDE;
    }

    if host == "raw.githubusercontent.com" {
        return SCORE_GITHUB_README;
    }

    if host == "github.com" && (path.contains("/wiki/") || path.contains("/blob/")) {
        return SCORE_WIKI;
    }

    if REGISTRY_HOSTS.iter().any(|h| host_is(&host, h)) {
        return SCORE_REGISTRY;
    }

    if BLOG_HOSTS.iter().any(|h| host_is(&host, h)) {
        return SCORE_BLOG;
    }

    if host_is(&host, "stackoverflow.com") {
        return SCORE_STACKOVERFLOW;
    }

    if host == "web.archive.org" {
        return SCORE_WAYBACK;
    }

    SCORE_UNKNOWN
}

fn host_is(host: &str, base: &str) -> bool {
    host == base || host.ends_with(&format!(".{}", base))
}

/// Clamps an arbitrary score into the valid range
pub fn clamp_score(score: u8) -> u8 {
    score.clamp(SCORE_MIN, SCORE_MAX)
}
