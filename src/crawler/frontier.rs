//! URL frontier: the prioritized, deduplicated set of URLs awaiting fetch
//!
//! Candidates are keyed by their normalized URL. Seeds and sitemap entries
//! sit at depth 0 and links found on a fetched page at depth 1; nothing
//! deeper is accepted.

use crate::url::{
    clamp_score, is_binary_path, is_skipped_path, normalize_url, same_origin, score_url,
    SCORE_SITEMAP_DOC,
};
use crate::UrlResult;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use url::Url;

/// Deepest link hop the frontier accepts
pub const MAX_DEPTH: u32 = 1;

/// A URL waiting to be fetched
#[derive(Debug, Clone)]
pub struct UrlCandidate {
    /// The URL as it was supplied or found in markup
    pub raw_url: String,

    pub normalized_url: Url,

    /// Priority from 1 (least useful) to 5 (API reference)
    pub score: u8,

    /// 0 for seeds and sitemap entries, parent depth + 1 for discovered links
    pub depth: u32,

    /// Page the link was found on; `None` for seeds and sitemap entries
    pub discovered_from: Option<Url>,
}

impl UrlCandidate {
    /// Creates a seed candidate scored from its URL
    pub fn seed(raw_url: &str) -> UrlResult<Self> {
        let normalized_url = normalize_url(raw_url)?;
        Ok(Self {
            raw_url: raw_url.to_string(),
            score: score_url(&normalized_url),
            normalized_url,
            depth: 0,
            discovered_from: None,
        })
    }

    /// Creates a depth-0 candidate for a documentation URL from a sitemap
    ///
    /// The caller is responsible for keeping it on the seed's origin.
    pub fn from_sitemap(raw_url: &str) -> UrlResult<Self> {
        Ok(Self::seed(raw_url)?.with_score(SCORE_SITEMAP_DOC))
    }

    /// Creates a candidate for a link found on `parent`
    pub fn discovered(raw_url: &str, parent: &UrlCandidate) -> UrlResult<Self> {
        let normalized_url = normalize_url(raw_url)?;
        Ok(Self {
            raw_url: raw_url.to_string(),
            score: score_url(&normalized_url),
            normalized_url,
            depth: parent.depth + 1,
            discovered_from: Some(parent.normalized_url.clone()),
        })
    }

    /// Overrides the derived score, clamped into 1..=5
    pub fn with_score(mut self, score: u8) -> Self {
        self.score = clamp_score(score);
        self
    }

    /// The frontier key
    pub fn key(&self) -> &str {
        self.normalized_url.as_str()
    }

    pub fn is_seed(&self) -> bool {
        self.discovered_from.is_none()
    }

    fn path_len(&self) -> usize {
        self.normalized_url.path().len()
    }
}

// Sorting ascending yields fetch order: higher score first, then shorter
// path, then URL text
impl Ord for UrlCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then_with(|| self.path_len().cmp(&other.path_len()))
            .then_with(|| self.key().cmp(other.key()))
    }
}

impl PartialOrd for UrlCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for UrlCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key() && self.score == other.score
    }
}

impl Eq for UrlCandidate {}

/// Why a candidate was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    TooDeep,
    CrossDomain,
    AlreadyFetched,
    SkippedPath,
}

/// Result of [`Frontier::enqueue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Added,
    /// The URL was already pending; `score` is the merged score
    Merged { score: u8 },
    Rejected(RejectReason),
}

impl EnqueueOutcome {
    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added)
    }
}

/// Pending candidates plus the set of URLs already handed out
#[derive(Debug, Default)]
pub struct Frontier {
    pending: HashMap<String, UrlCandidate>,
    visited: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a candidate, merging with an existing entry for the same URL
    ///
    /// Seeds skip the same-domain and path checks; discovered links must stay
    /// on their parent's host and avoid skip-listed or binary paths.
    pub fn enqueue(&mut self, candidate: UrlCandidate) -> EnqueueOutcome {
        if candidate.depth > MAX_DEPTH {
            return EnqueueOutcome::Rejected(RejectReason::TooDeep);
        }

        if let Some(parent) = &candidate.discovered_from {
            if !same_origin(parent, &candidate.normalized_url) {
                return EnqueueOutcome::Rejected(RejectReason::CrossDomain);
            }

            let path = candidate.normalized_url.path();
            if is_skipped_path(path) || is_binary_path(path) {
                return EnqueueOutcome::Rejected(RejectReason::SkippedPath);
            }
        }

        if self.visited.contains(candidate.key()) {
            return EnqueueOutcome::Rejected(RejectReason::AlreadyFetched);
        }

        if let Some(existing) = self.pending.get_mut(candidate.key()) {
            existing.score = existing.score.max(candidate.score);
            if candidate.depth < existing.depth {
                existing.depth = candidate.depth;
                existing.discovered_from = candidate.discovered_from;
            }
            tracing::trace!("Merged {} (score {})", existing.key(), existing.score);
            return EnqueueOutcome::Merged {
                score: existing.score,
            };
        }

        tracing::trace!(
            "Queued {} (score {}, depth {})",
            candidate.key(),
            candidate.score,
            candidate.depth
        );
        self.pending.insert(candidate.key().to_string(), candidate);
        EnqueueOutcome::Added
    }

    /// Removes and returns up to `n` candidates in priority order
    ///
    /// Returned URLs are remembered so they are never queued again.
    pub fn dequeue_batch(&mut self, n: usize) -> Vec<UrlCandidate> {
        let mut all: Vec<UrlCandidate> = self.pending.drain().map(|(_, c)| c).collect();
        all.sort();

        let rest = all.split_off(n.min(all.len()));
        for candidate in rest {
            self.pending.insert(candidate.key().to_string(), candidate);
        }

        for candidate in &all {
            self.visited.insert(candidate.key().to_string());
        }
        all
    }

    /// Number of pending candidates
    pub fn size(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of URLs handed out so far
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}
