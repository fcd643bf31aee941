//! Release information: the current version and recent changelog entries

use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::LazyLock;
use url::Url;

/// Most entries kept from one changelog
pub const MAX_CHANGELOG_ENTRIES: usize = 5;

/// Characters kept per entry summary
const SUMMARY_MAX_CHARS: usize = 300;

/// Lines kept per entry summary
const SUMMARY_MAX_LINES: usize = 5;

/// How far past the last heading its summary may reach (bytes)
const LAST_ENTRY_SPAN: usize = 500;

static VERSION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // v1.2.3, V1.2
        r"(?i)\bv(\d+\.\d+(?:\.\d+)?(?:-[\w.]+)?)\b",
        // version 1.2.3, Version: 1.2
        r"(?i)\bversion[:\s]+(\d+\.\d+(?:\.\d+)?(?:-[\w.]+)?)\b",
        // @scope/package@1.2.3
        r"(?i)@[\w-]+/[\w-]+@(\d+\.\d+(?:\.\d+)?)",
        // package@1.2.3
        r"[\w-]+@(\d+\.\d+(?:\.\d+)?)\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("version regex is valid")) // Static pattern, safe to panic
    .collect()
});

static CHANGELOG_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^#{1,3}[ \t]+(?:v(?:ersion)?[ \t]*)?(\d+\.\d+(?:\.\d+)?(?:-[\w.]+)?)(?:[ \t]*[(\[][ \t]*(\d{4}-\d{2}-\d{2})[ \t]*[)\]])?",
    )
    .expect("changelog heading regex is valid") // Static pattern, safe to panic
});

/// One release from a changelog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangelogEntry {
    pub version: String,

    /// Release date as written (`YYYY-MM-DD`), when the heading has one
    pub date: Option<String>,

    /// First lines of the release notes
    pub summary: String,
}

/// Guesses the current version of the documented project from page text
///
/// Versions mentioned most often win; ties go to the earliest mention.
///
/// # Examples
///
/// ```
/// use doc_harvest::extract::detect_version;
///
/// let text = "Install v2.1.0 with npm install hono@2.1.0. Upgrading from v1.9?";
/// assert_eq!(detect_version(text), Some("2.1.0".to_string()));
/// assert_eq!(detect_version("no numbers here"), None);
/// ```
pub fn detect_version(text: &str) -> Option<String> {
    // version -> (mentions, earliest position)
    let mut candidates: HashMap<&str, (usize, usize)> = HashMap::new();

    for pattern in VERSION_PATTERNS.iter() {
        for captures in pattern.captures_iter(text) {
            let (Some(whole), Some(version)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let entry = candidates
                .entry(version.as_str())
                .or_insert((0, whole.start()));
            entry.0 += 1;
            entry.1 = entry.1.min(whole.start());
        }
    }

    candidates
        .into_iter()
        .min_by(|(a, (a_count, a_pos)), (b, (b_count, b_pos))| {
            b_count.cmp(a_count).then(a_pos.cmp(b_pos)).then(a.cmp(b))
        })
        .map(|(version, _)| version.to_string())
}

/// Parses up to `limit` releases from Markdown-style changelog text
///
/// Releases start at `#`, `##` or `###` headings naming a version, with an
/// optional date in parentheses or brackets.
pub fn changelog_entries(text: &str, limit: usize) -> Vec<ChangelogEntry> {
    let headings: Vec<_> = CHANGELOG_HEADING.captures_iter(text).collect();

    headings
        .iter()
        .take(limit)
        .enumerate()
        .filter_map(|(i, captures)| {
            let whole = captures.get(0)?;
            let start = whole.end();
            let end = match headings.get(i + 1).and_then(|next| next.get(0)) {
                Some(next) => next.start(),
                None => floor_char_boundary(text, start + LAST_ENTRY_SPAN),
            };

            Some(ChangelogEntry {
                version: captures.get(1)?.as_str().to_string(),
                date: captures.get(2).map(|d| d.as_str().to_string()),
                summary: summarize(&text[start..end]),
            })
        })
        .collect()
}

/// Changelog text with headings marked up as Markdown
///
/// Markup is run through extraction and every heading line gets a `## `
/// prefix; anything else (a raw `CHANGELOG.md`) is returned unchanged.
pub fn changelog_text(body: &str, url: &Url) -> String {
    if !body.trim_start().starts_with('<') {
        return body.to_string();
    }

    let document = super::extract(body, url);
    let mut headings = document.headings.iter().peekable();
    document
        .text
        .lines()
        .map(|line| {
            if headings.peek().is_some_and(|h| h.as_str() == line) {
                headings.next();
                format!("## {}", line)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn summarize(notes: &str) -> String {
    let summary = notes
        .trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(SUMMARY_MAX_LINES)
        .collect::<Vec<_>>()
        .join("\n");
    summary.chars().take(SUMMARY_MAX_CHARS).collect()
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
