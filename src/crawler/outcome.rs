//! Fetch outcomes
//!
//! Every fetch ends in exactly one [`FetchStatus`]. Nothing about a single
//! URL is ever raised as an error; callers match on the status instead.

use crate::security::BlockReason;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Reason recorded for fetches cut off by the run deadline
pub const DEADLINE_EXCEEDED: &str = "run deadline exceeded";

/// How a fetch ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchStatus {
    /// Usable content was retrieved
    Ok { status_code: u16 },

    /// HTTP success, but the content is a sign-in wall, stub or repeat
    SoftFailure { reason: String },

    /// Network trouble or a server error that outlasted the attempt budget
    TransientError { reason: String },

    /// A client error or unusable redirect; never retried
    PermanentError {
        status_code: Option<u16>,
        reason: String,
    },

    /// Refused by the security guard before any request was sent
    Blocked { reason: BlockReason },
}

impl FetchStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// The status of a fetch the run deadline cancelled
    pub fn deadline_exceeded() -> Self {
        Self::TransientError {
            reason: DEADLINE_EXCEEDED.to_string(),
        }
    }

    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::TransientError { reason } if reason == DEADLINE_EXCEEDED)
    }

    /// Short label used in logs and statistics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ok { .. } => "ok",
            Self::SoftFailure { .. } => "soft_failure",
            Self::TransientError { .. } => "transient_error",
            Self::PermanentError { .. } => "permanent_error",
            Self::Blocked { .. } => "blocked",
        }
    }
}

/// The immutable result of fetching one URL
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Normalized URL that was requested
    pub url: String,

    /// Where redirects ended, when they moved the request
    pub final_url: Option<String>,

    pub status: FetchStatus,

    /// Response body; present only for `Ok`
    pub body: Option<String>,

    /// Response headers with lowercase names; absent for cache hits
    pub headers: Option<BTreeMap<String, String>>,

    pub fetched_at: DateTime<Utc>,

    /// Requests issued; 0 for cache hits and URLs blocked up front
    pub attempt_count: u32,

    pub from_cache: bool,
}

impl FetchOutcome {
    pub(crate) fn new(url: impl Into<String>, status: FetchStatus, attempt_count: u32) -> Self {
        Self {
            url: url.into(),
            final_url: None,
            status,
            body: None,
            headers: None,
            fetched_at: Utc::now(),
            attempt_count,
            from_cache: false,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// The URL the body actually came from
    pub fn effective_url(&self) -> &str {
        self.final_url.as_deref().unwrap_or(&self.url)
    }
}
