//! robots.txt handling
//!
//! Rules are fetched once per origin through the fetcher, so the request is
//! guarded and rate limited like any other. A missing file, an error status
//! or a failed request all mean "allow everything".

mod cache;
mod parser;

pub use cache::{CachedRobots, ROBOTS_MAX_AGE_HOURS};
pub use parser::ParsedRobots;

use crate::crawler::{FetchStatus, Fetcher};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

/// Per-origin robots.txt rules
///
/// Concurrent checks against one origin wait for a single fetch instead of
/// each requesting robots.txt.
#[derive(Debug)]
pub struct RobotsCache {
    user_agent: String,
    origins: DashMap<String, Arc<Mutex<Option<CachedRobots>>>>,
}

impl RobotsCache {
    /// Creates an empty cache matching rules for `user_agent`'s product token
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            origins: DashMap::new(),
        }
    }

    /// Checks `url` against its origin's rules, fetching them when needed
    pub async fn is_allowed(&self, fetcher: &Fetcher, url: &Url) -> bool {
        self.with_rules(fetcher, url, |rules| rules.is_allowed(url, &self.user_agent))
            .await
    }

    /// Sitemap URLs listed in the robots.txt of `url`'s origin
    pub async fn sitemaps(&self, fetcher: &Fetcher, url: &Url) -> Vec<String> {
        self.with_rules(fetcher, url, ParsedRobots::sitemaps).await
    }

    async fn with_rules<T>(
        &self,
        fetcher: &Fetcher,
        url: &Url,
        f: impl FnOnce(&ParsedRobots) -> T,
    ) -> T {
        let origin = url.origin().ascii_serialization();
        let slot = self
            .origins
            .entry(origin.clone())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone();

        let mut entry = slot.lock().await;
        let cached = match entry.take() {
            Some(cached) if !cached.is_stale() => cached,
            _ => CachedRobots::new(fetch_rules(fetcher, &origin).await),
        };
        let result = f(&cached.rules);
        *entry = Some(cached);
        result
    }

    /// Installs rules for an origin without fetching
    pub async fn insert(&self, origin: &str, rules: ParsedRobots) {
        let slot = self
            .origins
            .entry(origin.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone();
        *slot.lock().await = Some(CachedRobots::new(rules));
    }

    /// Number of origins with rules loaded or loading
    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }
}

/// Fetches and parses `origin/robots.txt`, allowing all on any failure
pub async fn fetch_rules(fetcher: &Fetcher, origin: &str) -> ParsedRobots {
    let Ok(robots_url) = Url::parse(&format!("{}/robots.txt", origin)) else {
        return ParsedRobots::allow_all();
    };

    let outcome = fetcher.fetch_plain(&robots_url).await;
    match (&outcome.status, outcome.body) {
        (FetchStatus::Ok { status_code: 200 }, Some(body)) => {
            debug!(%robots_url, "Loaded robots.txt");
            ParsedRobots::from_content(&body)
        }
        (status, _) => {
            debug!(%robots_url, status = status.label(), "No usable robots.txt, allowing all");
            ParsedRobots::allow_all()
        }
    }
}
