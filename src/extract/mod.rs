//! Content extraction
//!
//! Turns raw page markup into an [`ExtractedDocument`]: the primary text
//! with navigation and other chrome stripped, plus headings, code blocks,
//! tables and the documentation links worth following. Extraction is
//! deterministic for a given input. Release information (version,
//! changelog entries) is read from extracted text.

mod content;
mod links;
mod release;

pub use content::{collapse_whitespace, is_boilerplate, normalize_lines, select_region};
pub use links::extract_links;
pub use release::{
    changelog_entries, changelog_text, detect_version, ChangelogEntry, MAX_CHANGELOG_ENTRIES,
};

use scraper::Html;
use serde::Serialize;
use url::Url;

/// The useful content of one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedDocument {
    pub url: String,

    /// `<title>`, else the first heading, else empty
    pub title: String,

    /// Primary text, one block per line
    pub text: String,

    /// Same-host documentation links, normalized, in document order
    pub outbound_links: Vec<String>,

    pub headings: Vec<String>,
    pub code_blocks: Vec<String>,

    /// Tables rendered as Markdown
    pub tables: Vec<String>,

    pub word_count: usize,
}

/// Extracts the primary content and links from `raw_markup` fetched at `url`
///
/// # Example
///
/// ```
/// use doc_harvest::extract::extract;
/// use url::Url;
///
/// let html = r#"<html><head><title>Intro</title></head><body>
///     <nav><a href="/pricing">Pricing</a></nav>
///     <main><p>Install the package.</p><a href="/docs/setup">Setup</a></main>
/// </body></html>"#;
/// let url = Url::parse("https://example.com/docs/intro").unwrap();
///
/// let doc = extract(html, &url);
/// assert_eq!(doc.title, "Intro");
/// assert_eq!(doc.outbound_links, vec!["https://example.com/docs/setup"]);
/// ```
pub fn extract(raw_markup: &str, url: &Url) -> ExtractedDocument {
    let document = Html::parse_document(raw_markup);
    let region = content::select_region(&document);

    let text = content::region_text(region);
    let headings = content::headings(region);
    let title = content::document_title(&document)
        .or_else(|| headings.first().cloned())
        .unwrap_or_default();

    ExtractedDocument {
        url: url.to_string(),
        title,
        word_count: text.split_whitespace().count(),
        text,
        outbound_links: links::extract_links(&document, url),
        code_blocks: content::code_blocks(region),
        tables: content::tables(region),
        headings,
    }
}
