//! doc-harvest: a polite documentation fetcher
//!
//! This crate implements the content-acquisition engine used to gather
//! reference documentation for a topic. It queues candidate URLs, fetches
//! them under per-domain rate limits with retries, caches pages on disk,
//! extracts the primary text and deduplicates near-identical pages, all
//! behind an SSRF and path-traversal guard.

pub mod cache;
pub mod config;
pub mod crawler;
pub mod dedup;
pub mod extract;
pub mod output;
pub mod robots;
pub mod security;
pub mod url;

use thiserror::Error;

/// Main error type for doc-harvest operations
///
/// Per-URL problems never surface here; they are reported through
/// [`crawler::FetchOutcome`]. These errors cover setup and I/O that make a
/// whole run impossible.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Refused by security guard: {0}")]
    Blocked(#[from] security::BlockReason),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid host pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for doc-harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{FetchOutcome, FetchStatus, Harvester};
pub use extract::ExtractedDocument;
pub use output::HarvestReport;
pub use url::{extract_domain, normalize_url};
