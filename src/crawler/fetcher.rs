//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester, including:
//! - Building HTTP clients with proper user agent strings
//! - Security checks on the target and on every redirect hop
//! - Per-domain rate limiting and a bounded pool of in-flight requests
//! - Read-through page caching
//! - Retry with exponential backoff for transient failures
//! - Outcome classification

use crate::cache::PageStore;
use crate::config::Config;
use crate::crawler::outcome::{FetchOutcome, FetchStatus};
use crate::crawler::rate_limiter::RateLimiter;
use crate::crawler::soft_failure::{SeenContent, SoftFailureDetector};
use crate::security::{SecurityGuard, Verdict};
use crate::url::{extract_domain, normalize_url};
use reqwest::header::{HeaderMap, LOCATION};
use reqwest::{redirect::Policy, Client};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// Redirects are disabled in the client; the fetcher follows them itself so
/// that each hop passes the security guard.
///
/// # Example
///
/// ```no_run
/// use doc_harvest::config::Config;
/// use doc_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&Config::default()).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.header_value())
        .timeout(config.engine.request_timeout())
        .connect_timeout(config.engine.connect_timeout())
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Result of one request after redirects were followed
enum Hop {
    /// A non-redirect response; the body is read only for 2xx
    Response {
        final_url: Url,
        status_code: u16,
        headers: BTreeMap<String, String>,
        body: Option<String>,
    },

    /// Ended without a usable response and must not be retried
    Terminal(FetchStatus),

    /// Network or body error worth another attempt
    Retry(String),
}

/// Result of one fetch attempt
enum Attempt {
    Done(FetchOutcome),
    Retry(String),
}

/// Fetches pages on behalf of the harvester
///
/// All collaborators are injected so that several fetchers can share a
/// limiter or a cache.
pub struct Fetcher {
    client: Client,
    guard: Arc<SecurityGuard>,
    limiter: Arc<RateLimiter>,
    cache: Option<Arc<dyn PageStore>>,
    pool: Semaphore,
    soft_failures: SoftFailureDetector,
    /// Checksums for fetches made outside a harvester run
    seen: SeenContent,
    attempt_budget: u32,
    backoff_base: Duration,
    max_redirects: u32,
    cache_ttl: Duration,
    cache_write_failures: AtomicU64,
}

impl Fetcher {
    pub fn new(
        config: &Config,
        guard: Arc<SecurityGuard>,
        limiter: Arc<RateLimiter>,
        cache: Option<Arc<dyn PageStore>>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            guard,
            limiter,
            cache,
            pool: Semaphore::new(config.engine.concurrency.max(1) as usize),
            soft_failures: SoftFailureDetector::from_config(&config.content),
            seen: SeenContent::new(),
            attempt_budget: config.engine.attempt_budget.max(1),
            backoff_base: config.engine.backoff_base(),
            max_redirects: config.engine.max_redirects,
            cache_ttl: config.cache.ttl(),
            cache_write_failures: AtomicU64::new(0),
        })
    }

    pub fn guard(&self) -> &SecurityGuard {
        &self.guard
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Cache writes that failed so far
    pub fn cache_write_failures(&self) -> u64 {
        self.cache_write_failures.load(Ordering::Relaxed)
    }

    /// Fetches a URL with caching, retries and outcome classification
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Guard refuses target or hop | Immediate → Blocked |
    /// | HTTP 2xx, usable content | Ok, written to cache |
    /// | HTTP 2xx, unusable content | Immediate → SoftFailure |
    /// | Redirect without Location / too many hops | Immediate → PermanentError |
    /// | HTTP 4xx | Immediate → PermanentError |
    /// | HTTP 5xx, timeout, connection or body error | Retry with backoff |
    ///
    /// Backoff before attempt `n + 1` is `backoff_base * 2^(n - 1)`. The
    /// pool permit and rate slot are released before sleeping.
    ///
    /// Repeated content is judged against every page this fetcher accepted
    /// through `fetch`. Use [`Fetcher::fetch_in`] to scope that to one run.
    pub async fn fetch(&self, raw_url: &str) -> FetchOutcome {
        self.fetch_in(raw_url, &self.seen).await
    }

    /// Like [`Fetcher::fetch`], recording accepted content in `seen`
    pub async fn fetch_in(&self, raw_url: &str, seen: &SeenContent) -> FetchOutcome {
        let url = match normalize_url(raw_url) {
            Ok(url) => url,
            Err(e) => {
                return FetchOutcome::new(
                    raw_url,
                    FetchStatus::PermanentError {
                        status_code: None,
                        reason: e.to_string(),
                    },
                    0,
                )
            }
        };

        let mut last_reason = String::new();
        for attempt in 1..=self.attempt_budget {
            if let Verdict::Block(reason) = self.guard.check_outbound(&url).await {
                warn!(url = %url, %reason, "Blocked by security guard");
                return FetchOutcome::new(url.as_str(), FetchStatus::Blocked { reason }, attempt - 1);
            }

            if attempt == 1 {
                if let Some(outcome) = self.cached(&url, seen) {
                    return outcome;
                }
            }

            match self.attempt(&url, attempt, seen).await {
                Attempt::Done(outcome) => return outcome,
                Attempt::Retry(reason) => {
                    debug!(url = %url, attempt, %reason, "Transient failure");
                    last_reason = reason;
                }
            }

            if attempt < self.attempt_budget {
                let delay = self.backoff_delay(attempt);
                debug!(url = %url, ?delay, "Backing off before retry");
                tokio::time::sleep(delay).await;
            }
        }

        warn!(url = %url, attempts = self.attempt_budget, reason = %last_reason, "Giving up");
        FetchOutcome::new(
            url.as_str(),
            FetchStatus::TransientError {
                reason: format!(
                    "gave up after {} attempts: {}",
                    self.attempt_budget, last_reason
                ),
            },
            self.attempt_budget,
        )
    }

    /// Issues a single guarded, rate-limited GET
    ///
    /// No cache, retries or soft-failure checks. Used for robots.txt.
    pub async fn fetch_plain(&self, url: &Url) -> FetchOutcome {
        if let Verdict::Block(reason) = self.guard.check_outbound(url).await {
            return FetchOutcome::new(url.as_str(), FetchStatus::Blocked { reason }, 0);
        }

        match self.follow(url).await {
            Hop::Response {
                final_url,
                status_code,
                headers,
                body,
            } => {
                let status = match status_code {
                    200..=299 => FetchStatus::Ok { status_code },
                    500..=599 => FetchStatus::TransientError {
                        reason: format!("HTTP {}", status_code),
                    },
                    _ => FetchStatus::PermanentError {
                        status_code: Some(status_code),
                        reason: format!("HTTP {}", status_code),
                    },
                };
                let mut outcome = FetchOutcome::new(url.as_str(), status, 1);
                if outcome.is_ok() {
                    outcome.body = body;
                }
                outcome.headers = Some(headers);
                outcome.final_url = redirected(url, &final_url);
                outcome
            }
            Hop::Terminal(status) => FetchOutcome::new(url.as_str(), status, 1),
            Hop::Retry(reason) => {
                FetchOutcome::new(url.as_str(), FetchStatus::TransientError { reason }, 1)
            }
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << (attempt.saturating_sub(1)).min(16);
        self.backoff_base.saturating_mul(factor)
    }

    /// Returns a cache hit as an outcome
    fn cached(&self, url: &Url, seen: &SeenContent) -> Option<FetchOutcome> {
        let cache = self.cache.as_ref()?;
        let entry = match cache.get(url.as_str()) {
            Ok(entry) => entry?,
            Err(e) => {
                warn!(url = %url, error = %e, "Cache lookup failed, fetching live");
                return None;
            }
        };

        debug!(url = %url, "Cache hit");
        seen.register(&entry.content);

        let mut outcome = FetchOutcome::new(url.as_str(), FetchStatus::Ok { status_code: 200 }, 0);
        outcome.body = Some(entry.content);
        outcome.from_cache = true;
        Some(outcome)
    }

    async fn attempt(&self, url: &Url, attempt: u32, seen: &SeenContent) -> Attempt {
        let (final_url, status_code, headers, body) = match self.follow(url).await {
            Hop::Response {
                final_url,
                status_code,
                headers,
                body,
            } => (final_url, status_code, headers, body),
            Hop::Terminal(status) => {
                if let FetchStatus::Blocked { reason } = &status {
                    warn!(url = %url, %reason, "Redirect blocked by security guard");
                }
                return Attempt::Done(FetchOutcome::new(url.as_str(), status, attempt));
            }
            Hop::Retry(reason) => return Attempt::Retry(reason),
        };

        let status = match status_code {
            200..=299 => {
                let rejected = body
                    .as_deref()
                    .and_then(|b| self.soft_failures.check(b, seen));
                match rejected {
                    Some(reason) => {
                        debug!(url = %url, %reason, "Soft failure");
                        FetchStatus::SoftFailure { reason }
                    }
                    None => FetchStatus::Ok { status_code },
                }
            }
            400..=499 => FetchStatus::PermanentError {
                status_code: Some(status_code),
                reason: format!("HTTP {}", status_code),
            },
            500..=599 => return Attempt::Retry(format!("HTTP {}", status_code)),
            _ => FetchStatus::PermanentError {
                status_code: Some(status_code),
                reason: format!("unexpected HTTP status {}", status_code),
            },
        };

        let mut outcome = FetchOutcome::new(url.as_str(), status, attempt);
        outcome.headers = Some(headers);
        outcome.final_url = redirected(url, &final_url);

        if outcome.is_ok() {
            if let Some(body) = &body {
                self.store(url, body);
            }
            outcome.body = body;
        }

        Attempt::Done(outcome)
    }

    fn store(&self, url: &Url, body: &str) {
        let Some(cache) = &self.cache else {
            return;
        };
        if let Err(e) = cache.put(url.as_str(), body, self.cache_ttl) {
            self.cache_write_failures.fetch_add(1, Ordering::Relaxed);
            warn!(url = %url, error = %e, "Failed to write page to cache");
        }
    }

    /// Sends a GET and follows redirects manually
    async fn follow(&self, url: &Url) -> Hop {
        let mut current = url.clone();
        let mut hops = 0u32;

        loop {
            if hops > 0 {
                if let Verdict::Block(reason) = self.guard.check_outbound(&current).await {
                    return Hop::Terminal(FetchStatus::Blocked { reason });
                }
            }

            let (status_code, headers, body) = match self.request(&current).await {
                Ok(response) => response,
                Err(e) => return Hop::Retry(describe_error(&e)),
            };

            if !(300..=399).contains(&status_code) {
                return Hop::Response {
                    final_url: current,
                    status_code,
                    headers: header_map(&headers),
                    body,
                };
            }

            let Some(next) = redirect_target(&current, &headers) else {
                return Hop::Terminal(FetchStatus::PermanentError {
                    status_code: Some(status_code),
                    reason: "redirect without a usable Location".to_string(),
                });
            };

            hops += 1;
            if hops > self.max_redirects {
                return Hop::Terminal(FetchStatus::PermanentError {
                    status_code: Some(status_code),
                    reason: format!("more than {} redirects", self.max_redirects),
                });
            }

            debug!(from = %current, to = %next, "Following redirect");
            current = next;
        }
    }

    /// One rate-limited request inside a pool permit
    ///
    /// The body is read for 2xx responses only, before the permit is released.
    async fn request(
        &self,
        url: &Url,
    ) -> Result<(u16, HeaderMap, Option<String>), reqwest::Error> {
        let domain = extract_domain(url).unwrap_or_default();
        // The slot is reserved only once a permit is held, so the request
        // starts at its slot and never queues behind the pool afterwards.
        let _permit = self.pool.acquire().await;
        let _slot = self.limiter.acquire(&domain).await;

        debug!(url = %url, "GET");
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        let headers = response.headers().clone();

        let body = if status.is_success() {
            Some(response.text().await?)
        } else {
            None
        };

        Ok((status.as_u16(), headers, body))
    }
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("attempt_budget", &self.attempt_budget)
            .field("backoff_base", &self.backoff_base)
            .field("max_redirects", &self.max_redirects)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

fn redirected(requested: &Url, final_url: &Url) -> Option<String> {
    (requested != final_url).then(|| final_url.to_string())
}

fn redirect_target(current: &Url, headers: &HeaderMap) -> Option<Url> {
    let location = headers.get(LOCATION)?.to_str().ok()?.trim();
    if location.is_empty() {
        return None;
    }
    current.join(location).ok()
}

fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect()
}

fn describe_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else if error.is_body() || error.is_decode() {
        format!("failed to read body: {}", error)
    } else {
        error.to_string()
    }
}
