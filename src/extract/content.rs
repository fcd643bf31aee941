//! Primary-content detection and text extraction

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

/// Elements never part of the primary content
const BOILERPLATE_TAGS: &[&str] = &[
    "nav", "header", "footer", "aside", "script", "style", "noscript", "svg", "iframe", "form",
    "template",
];

/// Class or id words that mark navigation chrome
const BOILERPLATE_HINTS: &[&str] = &[
    "nav",
    "navbar",
    "navigation",
    "sidebar",
    "footer",
    "menu",
    "breadcrumb",
    "breadcrumbs",
    "pagination",
    "cookie",
    "cookies",
    "banner",
    "ad",
    "ads",
    "advert",
    "advertisement",
];

const BOILERPLATE_ROLES: &[&str] = &[
    "navigation",
    "banner",
    "contentinfo",
    "complementary",
    "menu",
    "menubar",
    "search",
];

/// Content landmarks, tried in order
const LANDMARK_SELECTORS: &[&str] = &["main", "article", "[role='main']", "#content", ".content"];

/// Containers considered when no landmark has text
const CONTAINER_SELECTOR: &str = "div, section, td";

/// Children whose text counts toward a container's paragraph text
const PARAGRAPH_TAGS: &[&str] = &[
    "p", "pre", "ul", "ol", "dl", "table", "blockquote", "h1", "h2", "h3", "h4", "h5", "h6",
];

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "h1", "h2", "h3", "h4", "h5", "h6", "li", "tr",
    "blockquote", "pre", "hr", "ul", "ol", "dl", "dt", "dd", "table", "figure", "figcaption",
];

/// A code block is kept only when its trimmed text is longer than this
const MIN_CODE_BLOCK_LEN: usize = 20;

/// Returns true if the element is navigation, scripting or other chrome
pub fn is_boilerplate(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    if BOILERPLATE_TAGS.contains(&value.name()) {
        return true;
    }

    if let Some(role) = value.attr("role") {
        if BOILERPLATE_ROLES.contains(&role.trim().to_lowercase().as_str()) {
            return true;
        }
    }

    value
        .classes()
        .chain(value.id())
        .any(|token| has_boilerplate_hint(token))
}

fn has_boilerplate_hint(token: &str) -> bool {
    token
        .to_lowercase()
        .split(|c: char| c == '-' || c == '_')
        .any(|word| BOILERPLATE_HINTS.contains(&word))
}

fn inside_boilerplate(element: &ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| is_boilerplate(&ancestor))
}

/// Picks the element holding the page's primary content
///
/// The first landmark with text wins. Otherwise the container with the most
/// direct paragraph text is used (earliest on ties), falling back to `body`.
pub fn select_region(document: &Html) -> ElementRef<'_> {
    for css in LANDMARK_SELECTORS {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        let found = document.select(&selector).find(|el| {
            !is_boilerplate(el) && !inside_boilerplate(el) && !region_text(*el).is_empty()
        });
        if let Some(region) = found {
            return region;
        }
    }

    if let Some(region) = largest_text_block(document) {
        return region;
    }

    Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element())
}

fn largest_text_block(document: &Html) -> Option<ElementRef<'_>> {
    let selector = Selector::parse(CONTAINER_SELECTOR).ok()?;

    let mut best: Option<(ElementRef<'_>, usize)> = None;
    for element in document.select(&selector) {
        if is_boilerplate(&element) || inside_boilerplate(&element) {
            continue;
        }
        let len = direct_paragraph_len(&element);
        if len > best.map(|(_, l)| l).unwrap_or(0) {
            best = Some((element, len));
        }
    }

    best.map(|(element, _)| element)
}

fn direct_paragraph_len(element: &ElementRef<'_>) -> usize {
    element
        .children()
        .map(|child| match child.value() {
            Node::Text(text) => text.text.trim().len(),
            Node::Element(el) if PARAGRAPH_TAGS.contains(&el.name()) => ElementRef::wrap(child)
                .filter(|c| !is_boilerplate(c))
                .map(|c| c.text().map(|t| t.trim().len()).sum::<usize>())
                .unwrap_or(0),
            _ => 0,
        })
        .sum()
}

/// Visible text of `region` with boilerplate removed, one block per line
pub fn region_text(region: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(region, &mut raw);
    normalize_lines(&raw)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&text.text.replace(|c: char| c.is_whitespace(), " ")),
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                if is_boilerplate(&child) {
                    continue;
                }

                let name = child.value().name();
                if name == "br" {
                    out.push('\n');
                    continue;
                }

                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                collect_text(child, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Collapses whitespace within lines and drops empty lines
pub fn normalize_lines(raw: &str) -> String {
    raw.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Contents of `<title>`, whitespace collapsed
pub fn document_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|title| !title.is_empty())
}

/// Heading texts in document order
pub fn headings(region: ElementRef<'_>) -> Vec<String> {
    let Ok(selector) = Selector::parse("h1, h2, h3, h4, h5, h6") else {
        return Vec::new();
    };
    region
        .select(&selector)
        .filter(|el| !inside_boilerplate(el))
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|heading| !heading.is_empty())
        .collect()
}

/// Preformatted blocks longer than `MIN_CODE_BLOCK_LEN` characters,
/// formatting preserved
pub fn code_blocks(region: ElementRef<'_>) -> Vec<String> {
    let Ok(selector) = Selector::parse("pre") else {
        return Vec::new();
    };
    region
        .select(&selector)
        .filter(|el| !inside_boilerplate(el))
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|code| code.chars().count() > MIN_CODE_BLOCK_LEN)
        .collect()
}

/// Tables rendered as Markdown, header separator after the first row
pub fn tables(region: ElementRef<'_>) -> Vec<String> {
    let (Ok(table_sel), Ok(row_sel), Ok(cell_sel)) = (
        Selector::parse("table"),
        Selector::parse("tr"),
        Selector::parse("th, td"),
    ) else {
        return Vec::new();
    };

    let mut tables = Vec::new();
    for table in region.select(&table_sel) {
        if inside_boilerplate(&table) {
            continue;
        }

        let rows: Vec<Vec<String>> = table
            .select(&row_sel)
            .map(|row| {
                row.select(&cell_sel)
                    .map(|cell| {
                        collapse_whitespace(&cell.text().collect::<String>()).replace('|', "\\|")
                    })
                    .collect::<Vec<_>>()
            })
            .filter(|cells| !cells.is_empty())
            .collect();

        if rows.is_empty() {
            continue;
        }

        let mut lines = Vec::with_capacity(rows.len() + 1);
        for (i, row) in rows.iter().enumerate() {
            lines.push(format!("| {} |", row.join(" | ")));
            if i == 0 {
                let separator = vec!["---"; row.len()].join(" | ");
                lines.push(format!("| {} |", separator));
            }
        }
        tables.push(lines.join("\n"));
    }
    tables
}
