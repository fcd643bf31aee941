//! SQLite page cache
//!
//! One connection guarded by a mutex; every operation is a short statement
//! or two, so the lock is never held across an await point.

use crate::cache::schema::initialize_schema;
use crate::cache::traits::{CacheError, CacheResult, PageStore};
use crate::cache::CacheEntry;
use crate::config::MAX_CACHE_ENTRIES;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// SQLite-backed [`PageStore`] with TTL expiry and LRU eviction
pub struct SqliteCache {
    conn: Mutex<Connection>,
    max_entries: usize,
    access_seq: AtomicI64,
}

impl std::fmt::Debug for SqliteCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCache")
            .field("max_entries", &self.max_entries)
            .finish_non_exhaustive()
    }
}

impl SqliteCache {
    /// Opens or creates a cache database at `path`
    ///
    /// `max_entries` is clamped to at most 1000.
    pub fn open(path: &Path, max_entries: usize) -> CacheResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        Self::from_connection(conn, max_entries)
    }

    /// Creates an in-memory cache
    pub fn open_in_memory(max_entries: usize) -> CacheResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, max_entries)
    }

    fn from_connection(conn: Connection, max_entries: usize) -> CacheResult<Self> {
        initialize_schema(&conn)?;

        let last_seq: i64 = conn.query_row(
            "SELECT COALESCE(MAX(access_seq), 0) FROM cache_entries",
            [],
            |row| row.get(0),
        )?;

        let cache = Self {
            conn: Mutex::new(conn),
            max_entries: max_entries.clamp(1, MAX_CACHE_ENTRIES),
            access_seq: AtomicI64::new(last_seq),
        };

        // A previous run may have used a larger cap
        cache.evict_if_needed()?;
        Ok(cache)
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }

    fn next_seq(&self) -> i64 {
        self.access_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn evict_locked(&self, conn: &Connection) -> CacheResult<usize> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| {
            row.get(0)
        })?;

        let excess = count - self.max_entries as i64;
        if excess <= 0 {
            return Ok(0);
        }

        let removed = conn.execute(
            "DELETE FROM cache_entries WHERE key IN (
                SELECT key FROM cache_entries
                ORDER BY last_accessed_at ASC, access_seq ASC
                LIMIT ?1
            )",
            params![excess],
        )?;

        tracing::debug!("Evicted {} cache entries", removed);
        Ok(removed)
    }
}

impl PageStore for SqliteCache {
    fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                "SELECT content, inserted_at, ttl_secs, size_bytes FROM cache_entries WHERE key = ?1",
                params![key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((content, inserted_ms, ttl_secs, size_bytes)) = row else {
            return Ok(None);
        };

        let now = Utc::now();
        let expires_ms = inserted_ms.saturating_add(ttl_secs.saturating_mul(1000));
        if now.timestamp_millis() >= expires_ms {
            conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
            tracing::debug!("Cache entry expired: {}", key);
            return Ok(None);
        }

        conn.execute(
            "UPDATE cache_entries SET last_accessed_at = ?1, access_seq = ?2 WHERE key = ?3",
            params![now.timestamp_millis(), self.next_seq(), key],
        )?;

        Ok(Some(CacheEntry {
            key: key.to_string(),
            content,
            inserted_at: from_millis(inserted_ms),
            ttl: Duration::from_secs(ttl_secs.max(0) as u64),
            size_bytes: size_bytes.max(0) as u64,
            last_accessed_at: now,
        }))
    }

    fn put(&self, key: &str, content: &str, ttl: Duration) -> CacheResult<()> {
        let conn = self.lock()?;
        let now = Utc::now().timestamp_millis();
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);

        conn.execute(
            "INSERT INTO cache_entries
                (key, content, inserted_at, ttl_secs, size_bytes, last_accessed_at, access_seq)
             VALUES (?1, ?2, ?3, ?4, ?5, ?3, ?6)
             ON CONFLICT(key) DO UPDATE SET
                content = excluded.content,
                inserted_at = excluded.inserted_at,
                ttl_secs = excluded.ttl_secs,
                size_bytes = excluded.size_bytes,
                last_accessed_at = excluded.last_accessed_at,
                access_seq = excluded.access_seq",
            params![key, content, now, ttl_secs, content.len() as i64, self.next_seq()],
        )?;

        self.evict_locked(&conn)?;
        Ok(())
    }

    fn evict_if_needed(&self) -> CacheResult<usize> {
        let conn = self.lock()?;
        self.evict_locked(&conn)
    }

    fn len(&self) -> CacheResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| {
            row.get(0)
        })?;
        Ok(count.max(0) as usize)
    }

    fn clear(&self) -> CacheResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM cache_entries", [])?;
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.max_entries
    }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
