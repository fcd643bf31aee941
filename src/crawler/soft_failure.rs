//! Soft-failure detection
//!
//! A page can answer 200 and still be useless: a login wall, a "please
//! enable JavaScript" shell, an error page served with the wrong status, or
//! the exact same content already seen under another URL earlier in the
//! same run.

use crate::config::ContentConfig;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Mutex;

/// Checksums of the bodies accepted during one run
#[derive(Debug, Default)]
pub struct SeenContent {
    checksums: Mutex<HashSet<String>>,
}

impl SeenContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a body's checksum; false when it was already known
    pub fn register(&self, body: &str) -> bool {
        let checksum = content_checksum(body);
        match self.checksums.lock() {
            Ok(mut seen) => seen.insert(checksum),
            Err(poisoned) => poisoned.into_inner().insert(checksum),
        }
    }

    /// Number of distinct bodies recorded so far
    pub fn len(&self) -> usize {
        match self.checksums.lock() {
            Ok(seen) => seen.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Flags successful responses whose content is unusable
///
/// The detector itself holds only the rules. Duplicate detection goes
/// through the [`SeenContent`] of the run the fetch belongs to.
#[derive(Debug)]
pub struct SoftFailureDetector {
    min_content_length: usize,

    /// Lowercased markers
    markers: Vec<String>,

    scan_window: usize,
}

impl SoftFailureDetector {
    pub fn new(min_content_length: usize, markers: &[String], scan_window: usize) -> Self {
        Self {
            min_content_length,
            markers: markers.iter().map(|m| m.to_lowercase()).collect(),
            scan_window,
        }
    }

    pub fn from_config(config: &ContentConfig) -> Self {
        Self::new(
            config.min_content_length,
            &config.soft_failure_markers,
            config.marker_scan_window,
        )
    }

    /// Checks a body and, when it is usable, records its checksum in `seen`
    ///
    /// Returns the reason the body was rejected.
    pub fn check(&self, body: &str, seen: &SeenContent) -> Option<String> {
        if body.len() < self.min_content_length {
            return Some(format!(
                "content too short ({} bytes, minimum {})",
                body.len(),
                self.min_content_length
            ));
        }

        let head = scan_prefix(body, self.scan_window).to_lowercase();
        if let Some(marker) = self.markers.iter().find(|m| head.contains(m.as_str())) {
            return Some(format!("matched marker '{}'", marker));
        }

        if !seen.register(body) {
            return Some("same content as an earlier page".to_string());
        }

        None
    }
}

/// SHA-256 of the body with whitespace collapsed and case folded
pub fn content_checksum(body: &str) -> String {
    let normalized = body
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// The first `window` characters of `text`
fn scan_prefix(text: &str, window: usize) -> &str {
    match text.char_indices().nth(window) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
