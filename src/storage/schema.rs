//! Database schema definitions
//!
//! Attribute columns are nullable. The crawl writes the text marker `n/a` for
//! unavailable values, so a NULL marks a damaged row.

/// SQL schema for the graph database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl sessions
CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    seed TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Graph nodes, position preserves insertion order
CREATE TABLE IF NOT EXISTS artists (
    id INTEGER PRIMARY KEY,
    position INTEGER NOT NULL,
    name TEXT,
    track_ct,
    follower_ct,
    favorite_ct,
    url TEXT,
    city TEXT,
    country TEXT,
    explored INTEGER,
    encounters INTEGER
);

CREATE INDEX IF NOT EXISTS idx_artists_position ON artists(position);

-- Confirmed mutual follows
CREATE TABLE IF NOT EXISTS follows (
    from_id INTEGER NOT NULL,
    to_id INTEGER NOT NULL,
    UNIQUE(from_id, to_id)
);

CREATE INDEX IF NOT EXISTS idx_follows_from ON follows(from_id);
CREATE INDEX IF NOT EXISTS idx_follows_to ON follows(to_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
