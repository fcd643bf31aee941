//! Run statistics
//!
//! Counters are updated by the harvester as outcomes arrive and serialized
//! with the report.

use crate::crawler::FetchStatus;
use serde::Serialize;

/// Harvest run statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HarvestStats {
    /// URLs accepted into the frontier, seeds included
    pub discovered: u64,

    /// Of those, pages queued from sitemaps
    pub sitemap_urls: u64,

    /// Fetch outcomes produced, cache hits included
    pub fetched: u64,

    pub from_cache: u64,
    pub ok: u64,
    pub soft_failures: u64,
    pub transient_errors: u64,
    pub permanent_errors: u64,
    pub blocked: u64,

    /// Skipped because robots.txt disallows them
    pub robots_disallowed: u64,

    /// Extracted documents rejected as near-duplicates
    pub duplicates: u64,

    /// Documents in the report
    pub documents: u64,

    pub cache_write_failures: u64,

    /// True when the run deadline cut the run short
    pub deadline_exceeded: bool,

    pub elapsed_ms: u64,
}

impl HarvestStats {
    /// Counts one fetch outcome
    pub fn record(&mut self, status: &FetchStatus, from_cache: bool) {
        self.fetched += 1;
        if from_cache {
            self.from_cache += 1;
        }

        match status {
            FetchStatus::Ok { .. } => self.ok += 1,
            FetchStatus::SoftFailure { .. } => self.soft_failures += 1,
            FetchStatus::TransientError { .. } => self.transient_errors += 1,
            FetchStatus::PermanentError { .. } => self.permanent_errors += 1,
            FetchStatus::Blocked { .. } => self.blocked += 1,
        }
    }

    /// Fetches that did not yield usable content
    pub fn failed(&self) -> u64 {
        self.soft_failures + self.transient_errors + self.permanent_errors + self.blocked
    }

    /// Share of fetches that succeeded, in percent
    pub fn success_rate(&self) -> f64 {
        if self.fetched == 0 {
            0.0
        } else {
            (self.ok as f64 / self.fetched as f64) * 100.0
        }
    }

    /// Logs a summary of the run
    pub fn log_summary(&self) {
        tracing::info!(
            documents = self.documents,
            fetched = self.fetched,
            sitemap_urls = self.sitemap_urls,
            from_cache = self.from_cache,
            duplicates = self.duplicates,
            robots_disallowed = self.robots_disallowed,
            "Harvest finished in {} ms, {:.1}% of fetches succeeded",
            self.elapsed_ms,
            self.success_rate()
        );

        if self.failed() > 0 {
            tracing::info!(
                soft_failures = self.soft_failures,
                transient = self.transient_errors,
                permanent = self.permanent_errors,
                blocked = self.blocked,
                "Failed fetches: {}",
                self.failed()
            );
        }

        if self.cache_write_failures > 0 {
            tracing::warn!("{} pages could not be cached", self.cache_write_failures);
        }
    }
}
