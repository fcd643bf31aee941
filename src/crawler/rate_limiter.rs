//! Per-domain request spacing
//!
//! Requests to the same domain start at least `min_interval` apart. Requests
//! to different domains never wait on each other.
//!
//! Each caller reserves the next free start slot for its domain under a short
//! lock, releases the lock, then sleeps until that slot. Concurrent callers
//! therefore queue up at evenly spaced slots instead of all waking at once.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum interval between request starts per domain
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,

    /// Entries are `Arc`ed so the map shard lock is released before awaiting
    domains: DashMap<String, Arc<DomainState>>,
}

#[derive(Debug)]
struct DomainState {
    /// Start time of the most recently reserved slot
    last_start: Mutex<Option<Instant>>,
    request_count: AtomicU64,
}

impl DomainState {
    fn new() -> Self {
        Self {
            last_start: Mutex::new(None),
            request_count: AtomicU64::new(0),
        }
    }
}

/// Proof that the caller waited for its slot
///
/// Returned by [`RateLimiter::acquire`]; `start_at` is the instant the
/// request was cleared to start.
#[derive(Debug)]
pub struct RatePermit {
    pub domain: String,
    pub start_at: Instant,
}

impl RateLimiter {
    /// Creates a limiter; a zero interval disables waiting
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            domains: DashMap::new(),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until a request to `domain` may start
    ///
    /// The first request to a domain proceeds immediately. Every later one
    /// starts no earlier than `min_interval` after the previous reservation.
    pub async fn acquire(&self, domain: &str) -> RatePermit {
        let state = self
            .domains
            .entry(domain.to_string())
            .or_insert_with(|| Arc::new(DomainState::new()))
            .clone();

        let slot = {
            let mut last = state.last_start.lock().await;
            let now = Instant::now();
            let slot = match *last {
                Some(prev) => std::cmp::max(now, prev + self.min_interval),
                None => now,
            };
            *last = Some(slot);
            slot
        };

        let count = state.request_count.fetch_add(1, Ordering::SeqCst) + 1;
        let wait = slot.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            tracing::debug!(domain, ?wait, request = count, "Rate limiting domain");
        }

        tokio::time::sleep_until(slot).await;

        RatePermit {
            domain: domain.to_string(),
            start_at: slot,
        }
    }

    /// Number of slots handed out for a domain so far
    pub fn request_count(&self, domain: &str) -> u64 {
        self.domains
            .get(domain)
            .map(|s| s.request_count.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Number of domains seen so far
    pub fn domain_count(&self) -> usize {
        self.domains.len()
    }
}
