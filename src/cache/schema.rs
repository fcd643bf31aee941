//! Database schema for the page cache

/// SQL schema for the cache database
///
/// Timestamps are Unix milliseconds. `access_seq` increases on every read or
/// write and orders entries touched within the same millisecond.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    key TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    inserted_at INTEGER NOT NULL,
    ttl_secs INTEGER NOT NULL,
    size_bytes INTEGER NOT NULL,
    last_accessed_at INTEGER NOT NULL,
    access_seq INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cache_lru ON cache_entries(last_accessed_at, access_seq);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
