//! Harvesting engine
//!
//! This module contains the fetch pipeline, including:
//! - The URL frontier and its ordering rules
//! - Per-domain rate limiting
//! - HTTP fetching with retries, redirects and soft-failure detection
//! - Sitemap and changelog discovery
//! - The harvester run loop that ties everything together

mod coordinator;
pub mod discovery;
mod fetcher;
pub mod frontier;
mod outcome;
pub mod rate_limiter;
mod soft_failure;

pub use coordinator::Harvester;
pub use fetcher::{build_http_client, Fetcher};
pub use frontier::{EnqueueOutcome, Frontier, RejectReason, UrlCandidate, MAX_DEPTH};
pub use outcome::{FetchOutcome, FetchStatus, DEADLINE_EXCEEDED};
pub use rate_limiter::{RateLimiter, RatePermit};
pub use soft_failure::{content_checksum, SeenContent, SoftFailureDetector};

use crate::config::Config;
use crate::output::HarvestReport;
use crate::HarvestError;

/// Runs a complete harvest
///
/// This is the main entry point. It will:
/// 1. Validate the configuration and open the page cache
/// 2. Seed the frontier, adding documentation pages from sitemaps
/// 3. Fetch, extract and deduplicate pages batch by batch
/// 4. Follow documentation links one hop from the seeds
/// 5. Look for a changelog and the current version
/// 6. Return the report
pub async fn harvest<S: AsRef<str>>(
    config: Config,
    seeds: &[S],
) -> Result<HarvestReport, HarvestError> {
    Harvester::new(config)?.run(seeds).await
}
