//! Page cache
//!
//! Fetched pages are stored by normalized URL with a TTL and a bounded entry
//! count. The cache is an explicit component: callers open one and hand it to
//! the fetcher, and several independent caches may exist at once.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteCache;
pub use traits::{CacheError, CacheResult, PageStore};

use crate::config::CacheConfig;
use crate::security::resolve_output_path;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;

/// File name of the cache database inside the cache directory
pub const CACHE_FILE_NAME: &str = "pages.db";

/// A cached page
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Normalized URL
    pub key: String,
    pub content: String,
    pub inserted_at: DateTime<Utc>,
    pub ttl: Duration,
    pub size_bytes: u64,
    pub last_accessed_at: DateTime<Utc>,
}

/// Opens the on-disk cache described by `config`
///
/// The cache directory must resolve inside `allowed_roots`; it is created if
/// missing. The database is opened at the resolved location.
pub fn open_cache(config: &CacheConfig, allowed_roots: &[PathBuf]) -> CacheResult<SqliteCache> {
    let directory = resolve_output_path(&config.directory_path(), allowed_roots)?;

    std::fs::create_dir_all(&directory)?;
    let path = directory.join(CACHE_FILE_NAME);
    tracing::debug!("Opening page cache at {}", path.display());

    SqliteCache::open(&path, config.max_entries)
}
