//! Harvester - main run orchestration logic
//!
//! This module contains the run loop that coordinates all components:
//! - Seeding the frontier, sitemap pages included
//! - Draining it in priority batches, fetched in parallel under the run deadline
//! - Skipping URLs robots.txt disallows
//! - Extracting, deduplicating and collecting documents
//! - Feeding discovered links back into the frontier
//! - Looking for a changelog once the pages are in

use crate::cache::{open_cache, PageStore};
use crate::config::{validate, Config};
use crate::crawler::discovery::{discover_sitemap_urls, find_changelog};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::frontier::{EnqueueOutcome, Frontier, UrlCandidate, MAX_DEPTH};
use crate::crawler::outcome::{FetchOutcome, FetchStatus};
use crate::crawler::rate_limiter::RateLimiter;
use crate::crawler::soft_failure::SeenContent;
use crate::dedup::Deduplicator;
use crate::extract::{detect_version, extract};
use crate::output::{FailedFetch, HarvestReport};
use crate::robots::RobotsCache;
use crate::security::SecurityGuard;
use crate::HarvestError;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// What happened to one frontier URL inside a batch
enum Fetched {
    Outcome(FetchOutcome),
    Disallowed,
    /// Cancelled by the run deadline
    TimedOut,
}

/// Runs harvests against one configuration
///
/// The fetcher, and with it the rate limiter and cache, lives as long as the
/// harvester, so repeated runs share them. The set of page checksums used to
/// spot repeated content starts empty on every run.
pub struct Harvester {
    config: Arc<Config>,
    fetcher: Arc<Fetcher>,
    robots: Option<Arc<RobotsCache>>,
}

impl Harvester {
    /// Builds a harvester, opening the on-disk cache when it is enabled
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        validate(&config)?;

        let cache: Option<Arc<dyn PageStore>> = if config.cache.enabled {
            let roots = config.security.allowed_root_paths();
            Some(Arc::new(open_cache(&config.cache, &roots)?))
        } else {
            None
        };

        Self::with_cache(config, cache)
    }

    /// Builds a harvester around an explicitly provided cache
    pub fn with_cache(
        config: Config,
        cache: Option<Arc<dyn PageStore>>,
    ) -> Result<Self, HarvestError> {
        validate(&config)?;

        let guard = Arc::new(SecurityGuard::with_trusted_hosts(
            config.security.trusted_hosts.iter(),
        ));
        let limiter = Arc::new(RateLimiter::new(config.engine.min_domain_interval()));
        let fetcher = Fetcher::new(&config, guard, limiter, cache)?;

        let robots = config
            .engine
            .respect_robots
            .then(|| Arc::new(RobotsCache::new(config.user_agent.name.clone())));

        Ok(Self {
            config: Arc::new(config),
            fetcher: Arc::new(fetcher),
            robots,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Harvests documents starting from `seeds`
    ///
    /// Per-URL failures end up in the report; this only returns an error
    /// for problems that make the whole run impossible.
    pub async fn run<S: AsRef<str>>(&self, seeds: &[S]) -> Result<HarvestReport, HarvestError> {
        let engine = &self.config.engine;
        let clock = Instant::now();
        let deadline = clock + engine.run_deadline();

        let mut report = HarvestReport::new(Utc::now());
        let mut frontier = Frontier::new();
        let mut dedup = Deduplicator::from_config(&self.config.content);
        let seen = Arc::new(SeenContent::new());
        let mut seed_urls = Vec::new();

        for seed in seeds {
            let seed = seed.as_ref();
            match UrlCandidate::seed(seed) {
                Ok(candidate) => {
                    seed_urls.push(candidate.normalized_url.clone());
                    if frontier.enqueue(candidate).is_added() {
                        report.stats.discovered += 1;
                    }
                }
                Err(e) => {
                    warn!("Skipping seed {}: {}", seed, e);
                    report.stats.permanent_errors += 1;
                    report.failures.push(FailedFetch {
                        url: seed.to_string(),
                        status: FetchStatus::PermanentError {
                            status_code: None,
                            reason: e.to_string(),
                        },
                        attempt_count: 0,
                    });
                }
            }
        }

        let origins = distinct_origins(&seed_urls);
        if self.config.discovery.sitemaps {
            self.enqueue_sitemap_urls(&origins, deadline, &mut frontier, &mut report)
                .await;
        }

        info!(pending = frontier.size(), "Starting harvest");

        while !frontier.is_empty() && report.documents.len() < engine.max_documents {
            if Instant::now() >= deadline {
                info!("Run deadline reached with {} URLs pending", frontier.size());
                report.stats.deadline_exceeded = true;
                break;
            }

            let batch = frontier.dequeue_batch(engine.concurrency as usize);
            info!(
                batch = batch.len(),
                pending = frontier.size(),
                documents = report.documents.len(),
                "Fetching batch"
            );

            let results = self.fetch_batch(&batch, deadline, &seen).await;
            for (candidate, fetched) in batch.iter().zip(results) {
                self.process(candidate, fetched, &mut frontier, &mut dedup, &mut report);
            }
        }

        if self.config.discovery.changelog {
            self.add_changelog(&origins, deadline, &mut report).await;
        }

        report.stats.documents = report.documents.len() as u64;
        report.stats.cache_write_failures = self.fetcher.cache_write_failures();
        report.stats.elapsed_ms = clock.elapsed().as_millis() as u64;
        report.stats.log_summary();

        Ok(report)
    }

    /// Fetches a batch in parallel; results come back in batch order
    async fn fetch_batch(
        &self,
        batch: &[UrlCandidate],
        deadline: Instant,
        seen: &Arc<SeenContent>,
    ) -> Vec<Fetched> {
        let mut tasks = JoinSet::new();

        for (index, candidate) in batch.iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let robots = self.robots.clone();
            let seen = Arc::clone(seen);
            let url = candidate.normalized_url.clone();

            tasks.spawn(async move {
                let fetch = fetch_one(fetcher, robots, seen, url);
                let fetched = tokio::time::timeout_at(deadline, fetch)
                    .await
                    .unwrap_or(Fetched::TimedOut);
                (index, fetched)
            });
        }

        let mut results: Vec<Option<Fetched>> = (0..batch.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, fetched)) => results[index] = Some(fetched),
                Err(e) => warn!("Fetch task failed: {}", e),
            }
        }

        results
            .into_iter()
            .zip(batch)
            .map(|(result, candidate)| {
                result.unwrap_or_else(|| {
                    Fetched::Outcome(FetchOutcome::new(
                        candidate.key(),
                        FetchStatus::TransientError {
                            reason: "fetch task failed".to_string(),
                        },
                        0,
                    ))
                })
            })
            .collect()
    }

    fn process(
        &self,
        candidate: &UrlCandidate,
        fetched: Fetched,
        frontier: &mut Frontier,
        dedup: &mut Deduplicator,
        report: &mut HarvestReport,
    ) {
        let outcome = match fetched {
            Fetched::Disallowed => {
                debug!(url = %candidate.normalized_url, "Disallowed by robots.txt");
                report.stats.robots_disallowed += 1;
                return;
            }
            Fetched::TimedOut => {
                report.stats.deadline_exceeded = true;
                FetchOutcome::new(candidate.key(), FetchStatus::deadline_exceeded(), 0)
            }
            Fetched::Outcome(outcome) => outcome,
        };

        report.stats.record(&outcome.status, outcome.from_cache);

        let body = match (&outcome.status, outcome.body.as_deref()) {
            (FetchStatus::Ok { .. }, Some(body)) => body,
            _ => {
                report.failures.push(FailedFetch {
                    url: outcome.url.clone(),
                    status: outcome.status.clone(),
                    attempt_count: outcome.attempt_count,
                });
                return;
            }
        };

        if report.documents.len() >= self.config.engine.max_documents {
            return;
        }

        let page_url =
            Url::parse(outcome.effective_url()).unwrap_or_else(|_| candidate.normalized_url.clone());
        let document = extract(body, &page_url);

        if !dedup.admit(&document) {
            debug!(url = %page_url, "Near-duplicate document dropped");
            report.stats.duplicates += 1;
            return;
        }

        if candidate.depth < MAX_DEPTH {
            for link in &document.outbound_links {
                let Ok(discovered) = UrlCandidate::discovered(link, candidate) else {
                    continue;
                };
                match frontier.enqueue(discovered) {
                    EnqueueOutcome::Added => report.stats.discovered += 1,
                    EnqueueOutcome::Merged { .. } => {}
                    EnqueueOutcome::Rejected(reason) => {
                        debug!(link = %link, ?reason, "Link not queued");
                    }
                }
            }
        }

        if report.version.is_none() {
            report.version = detect_version(&document.text);
            if let Some(version) = &report.version {
                debug!(url = %page_url, version = %version, "Detected version");
            }
        }

        debug!(url = %page_url, words = document.word_count, "Accepted document");
        report.documents.push(document);
    }

    /// Queues documentation pages listed in each origin's sitemaps
    async fn enqueue_sitemap_urls(
        &self,
        origins: &[Url],
        deadline: Instant,
        frontier: &mut Frontier,
        report: &mut HarvestReport,
    ) {
        let limit = self.config.discovery.max_sitemap_urls;

        for origin in origins {
            let discovery =
                discover_sitemap_urls(&self.fetcher, self.robots.as_deref(), origin, limit);
            let Ok(urls) = tokio::time::timeout_at(deadline, discovery).await else {
                info!("Run deadline reached during sitemap discovery");
                report.stats.deadline_exceeded = true;
                return;
            };

            for url in urls {
                let Ok(candidate) = UrlCandidate::from_sitemap(url.as_str()) else {
                    continue;
                };
                if frontier.enqueue(candidate).is_added() {
                    report.stats.discovered += 1;
                    report.stats.sitemap_urls += 1;
                }
            }
        }
    }

    /// Fills in the changelog from the first origin that has one
    async fn add_changelog(&self, origins: &[Url], deadline: Instant, report: &mut HarvestReport) {
        if report.stats.deadline_exceeded || Instant::now() >= deadline {
            return;
        }

        let candidates = self.config.discovery.max_changelog_candidates;
        let search = async {
            for origin in origins {
                let found =
                    find_changelog(&self.fetcher, self.robots.as_deref(), origin, candidates).await;
                if found.is_some() {
                    return found;
                }
            }
            None
        };

        let found = match tokio::time::timeout_at(deadline, search).await {
            Ok(found) => found,
            Err(_) => {
                info!("Run deadline reached during changelog discovery");
                report.stats.deadline_exceeded = true;
                return;
            }
        };

        if let Some(found) = found {
            if report.version.is_none() {
                report.version = found.entries.first().map(|e| e.version.clone());
            }
            report.changelog_url = Some(found.url.to_string());
            report.changelog = found.entries;
        }
    }
}

/// One seed URL per origin, in seed order
fn distinct_origins(seed_urls: &[Url]) -> Vec<Url> {
    let mut seen = HashSet::new();
    seed_urls
        .iter()
        .filter(|url| seen.insert(url.origin().ascii_serialization()))
        .cloned()
        .collect()
}

async fn fetch_one(
    fetcher: Arc<Fetcher>,
    robots: Option<Arc<RobotsCache>>,
    seen: Arc<SeenContent>,
    url: Url,
) -> Fetched {
    if let Some(robots) = robots {
        if !robots.is_allowed(&fetcher, &url).await {
            return Fetched::Disallowed;
        }
    }
    Fetched::Outcome(fetcher.fetch_in(url.as_str(), &seen).await)
}

impl std::fmt::Debug for Harvester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harvester")
            .field("fetcher", &self.fetcher)
            .field("respect_robots", &self.robots.is_some())
            .finish()
    }
}
