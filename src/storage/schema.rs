//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the crawl database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Every host a URL has been recorded for
CREATE TABLE IF NOT EXISTS hosts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    host_name TEXT NOT NULL UNIQUE
);

-- Crawl jobs; crawled_at stays NULL while the job is pending
CREATE TABLE IF NOT EXISTS urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    protocol TEXT NOT NULL,
    host_id INTEGER NOT NULL REFERENCES hosts(id),
    path TEXT NOT NULL,
    discovered_at TEXT NOT NULL,
    crawled_at TEXT,
    UNIQUE(protocol, host_id, path)
);

CREATE INDEX IF NOT EXISTS idx_urls_pending ON urls(crawled_at);
CREATE INDEX IF NOT EXISTS idx_urls_host ON urls(protocol, host_id);

-- Rules learned from robots.txt files
CREATE TABLE IF NOT EXISTS robots_rules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    protocol TEXT NOT NULL,
    host_id INTEGER NOT NULL REFERENCES hosts(id),
    path_prefix TEXT NOT NULL,
    allowed INTEGER NOT NULL,
    UNIQUE(protocol, host_id, path_prefix, allowed)
);

CREATE INDEX IF NOT EXISTS idx_robots_rules_host ON robots_rules(protocol, host_id);

-- Raw content of fetched HTML documents
CREATE TABLE IF NOT EXISTS documents (
    url_id INTEGER PRIMARY KEY REFERENCES urls(id),
    content TEXT NOT NULL,
    fetched_at TEXT NOT NULL
);
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
