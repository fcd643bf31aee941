//! robots.txt rules, matched with the `robotstxt` crate

use robotstxt::DefaultMatcher;
use url::Url;

/// The robots.txt rules of one origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRobots {
    /// Raw file; `None` allows everything
    body: Option<String>,
}

impl ParsedRobots {
    pub fn from_content(content: &str) -> Self {
        Self {
            body: Some(content.to_string()),
        }
    }

    /// Rules used when robots.txt is missing or could not be fetched
    pub fn allow_all() -> Self {
        Self { body: None }
    }

    pub fn is_allow_all(&self) -> bool {
        self.body.as_deref().map_or(true, |b| b.trim().is_empty())
    }

    /// URLs from `Sitemap:` lines, in file order
    ///
    /// Sitemap lines apply to every agent, so they are read outside any
    /// user-agent group.
    pub fn sitemaps(&self) -> Vec<String> {
        let Some(body) = self.body.as_deref() else {
            return Vec::new();
        };

        body.lines()
            .map(|line| line.split('#').next().unwrap_or_default().trim())
            .filter_map(|line| {
                let (key, value) = line.split_once(':')?;
                key.trim().eq_ignore_ascii_case("sitemap").then(|| value.trim())
            })
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Checks whether `user_agent` may fetch `url`
    ///
    /// `user_agent` is the product token (`doc-harvest`), not the full
    /// header value.
    pub fn is_allowed(&self, url: &Url, user_agent: &str) -> bool {
        match self.body.as_deref() {
            Some(body) if !body.trim().is_empty() => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(body, user_agent, url.as_str())
            }
            _ => true,
        }
    }
}
