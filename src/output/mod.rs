//! Harvest report
//!
//! The report is what the engine hands back to its caller: the accepted
//! documents in order, the URLs that failed and why, release information
//! and run statistics. It serializes to JSON.

pub mod stats;

pub use stats::HarvestStats;

use crate::crawler::FetchStatus;
use crate::extract::{ChangelogEntry, ExtractedDocument};
use crate::security::resolve_output_path;
use crate::HarvestError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A URL that produced no document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFetch {
    pub url: String,
    pub status: FetchStatus,
    pub attempt_count: u32,
}

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct HarvestReport {
    pub started_at: DateTime<Utc>,

    /// Deduplicated documents in acceptance order
    pub documents: Vec<ExtractedDocument>,

    pub failures: Vec<FailedFetch>,

    /// Current version of the documented project, when one was detected
    pub version: Option<String>,

    /// Where the changelog was found
    pub changelog_url: Option<String>,

    /// Most recent releases, newest first as listed
    pub changelog: Vec<ChangelogEntry>,

    pub stats: HarvestStats,
}

impl HarvestReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            documents: Vec::new(),
            failures: Vec::new(),
            version: None,
            changelog_url: None,
            changelog: Vec::new(),
            stats: HarvestStats::default(),
        }
    }

    pub fn to_json(&self) -> Result<String, HarvestError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Writes the report as JSON to `path`
///
/// The path must resolve inside `allowed_roots`. The report goes to the
/// resolved location and missing parent directories are created.
pub fn write_report(
    report: &HarvestReport,
    path: &Path,
    allowed_roots: &[PathBuf],
) -> Result<(), HarvestError> {
    let resolved = resolve_output_path(path, allowed_roots)?;

    if let Some(parent) = resolved.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(&resolved, report.to_json()?)?;
    tracing::info!("Report written to {}", resolved.display());
    Ok(())
}
