//! A fetched robots.txt with its age

use crate::robots::ParsedRobots;
use chrono::{DateTime, Duration, Utc};

/// How long fetched rules are trusted before refetching
pub const ROBOTS_MAX_AGE_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct CachedRobots {
    pub rules: ParsedRobots,
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(rules: ParsedRobots) -> Self {
        Self::fetched_at(rules, Utc::now())
    }

    pub fn fetched_at(rules: ParsedRobots, fetched_at: DateTime<Utc>) -> Self {
        Self { rules, fetched_at }
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }

    /// True once the rules are older than 24 hours
    pub fn is_stale(&self) -> bool {
        self.age() > Duration::hours(ROBOTS_MAX_AGE_HOURS)
    }
}
