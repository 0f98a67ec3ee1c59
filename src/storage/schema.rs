//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Service-Harvester database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    seed_url TEXT NOT NULL,
    status TEXT NOT NULL,
    links_total INTEGER NOT NULL DEFAULT 0,
    attempted INTEGER NOT NULL DEFAULT 0,
    persisted INTEGER NOT NULL DEFAULT 0,
    skipped INTEGER NOT NULL DEFAULT 0,
    persist_failures INTEGER NOT NULL DEFAULT 0
);

-- Extracted service descriptions; source_url is informational, not unique
CREATE TABLE IF NOT EXISTS services (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL CHECK (length(title) > 0),
    prerequisites TEXT NOT NULL DEFAULT '',
    required_documents TEXT NOT NULL DEFAULT '',
    fees TEXT NOT NULL,
    legal_basis TEXT NOT NULL DEFAULT '',
    is_digital_service INTEGER,
    responsible_office TEXT,
    source_url TEXT NOT NULL,
    run_id INTEGER REFERENCES runs(id),
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_services_title ON services(title);
CREATE INDEX IF NOT EXISTS idx_services_office ON services(responsible_office);
CREATE INDEX IF NOT EXISTS idx_services_run ON services(run_id);

-- Downloadable forms, owned by their service
CREATE TABLE IF NOT EXISTS forms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    service_id INTEGER NOT NULL REFERENCES services(id) ON DELETE CASCADE,
    title TEXT NOT NULL CHECK (length(title) > 0),
    url TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_forms_service ON forms(service_id);
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
