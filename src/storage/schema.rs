//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Driftnet database.

/// Bumped whenever a table definition changes
pub const SCHEMA_VERSION: u32 = 1;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Crawled pages; rank stays NULL until the ranking job runs
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    rank REAL
);

-- One link record per crawled page
CREATE TABLE IF NOT EXISTS links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE
);

-- Ordered outgoing set of a link record
CREATE TABLE IF NOT EXISTS link_targets (
    link_id INTEGER NOT NULL REFERENCES links(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    target_url TEXT NOT NULL,
    UNIQUE(link_id, target_url)
);

CREATE INDEX IF NOT EXISTS idx_link_targets_link ON link_targets(link_id, position);

-- Inverted index
CREATE TABLE IF NOT EXISTS postings (
    word TEXT NOT NULL,
    url TEXT NOT NULL,
    count INTEGER NOT NULL,
    PRIMARY KEY (word, url)
);

CREATE INDEX IF NOT EXISTS idx_postings_url ON postings(url);

-- Frontier snapshot: queued URLs per tier in dequeue order
CREATE TABLE IF NOT EXISTS frontier_queue (
    url TEXT NOT NULL,
    tier TEXT NOT NULL,
    position INTEGER NOT NULL
);

-- Frontier snapshot: every URL ever enqueued
CREATE TABLE IF NOT EXISTS seen_urls (
    url TEXT PRIMARY KEY
);

-- Frontier snapshot: cached robots.txt bodies
CREATE TABLE IF NOT EXISTS domain_robots (
    domain TEXT PRIMARY KEY,
    robots_txt TEXT NOT NULL,
    fetched_at TEXT NOT NULL
);
"#;

/// Initializes the database schema and records its version
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_schema_version_recorded() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        let version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in [
            "pages",
            "links",
            "link_targets",
            "postings",
            "frontier_queue",
            "seen_urls",
            "domain_robots",
        ] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }
}
