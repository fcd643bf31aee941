//! Cache trait and error types

use crate::cache::CacheEntry;
use crate::security::BlockReason;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache location refused: {0}")]
    Blocked(#[from] BlockReason),

    #[error("Cache connection lock poisoned")]
    LockPoisoned,
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// A bounded page store keyed by normalized URL
///
/// Implementations are shared across fetch tasks, so every method takes
/// `&self` and handles its own locking.
pub trait PageStore: Send + Sync {
    /// Looks up a live entry
    ///
    /// An expired entry is removed and reported as a miss. A hit refreshes
    /// the entry's `last_accessed_at`.
    fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>>;

    /// Inserts or replaces an entry, then evicts down to the cap
    fn put(&self, key: &str, content: &str, ttl: Duration) -> CacheResult<()>;

    /// Removes least recently accessed entries until the count is within the cap
    ///
    /// Returns the number of entries removed.
    fn evict_if_needed(&self) -> CacheResult<usize>;

    /// Number of stored entries, expired ones included
    fn len(&self) -> CacheResult<usize>;

    fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Removes every entry
    fn clear(&self) -> CacheResult<()>;

    /// Maximum number of entries kept
    fn capacity(&self) -> usize;
}
