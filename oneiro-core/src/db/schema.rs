//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: journals and dreams
    r#"
    -- ============================================
    -- Journals: one row per named record collection
    -- ============================================

    CREATE TABLE IF NOT EXISTS journals (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        name             TEXT NOT NULL UNIQUE,
        created_at       DATETIME NOT NULL,
        updated_at       DATETIME NOT NULL
    );

    -- ============================================
    -- Dreams: the records themselves
    -- ============================================

    CREATE TABLE IF NOT EXISTS dreams (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        journal_id       INTEGER NOT NULL REFERENCES journals(id) ON DELETE CASCADE,
        title            TEXT,
        body             TEXT NOT NULL,
        mood             TEXT,
        lucidity         INTEGER,
        sleep_quality    INTEGER,

        -- JSON array of strings; duplicates allowed, order preserved
        tags             TEXT NOT NULL DEFAULT '[]',

        -- ISO date as entered; intentionally unvalidated at this layer
        dream_date       TEXT,

        created_at       DATETIME NOT NULL,
        updated_at       DATETIME NOT NULL
    );

    -- ============================================
    -- Indexes
    -- ============================================

    CREATE INDEX IF NOT EXISTS idx_dreams_journal ON dreams(journal_id);
    CREATE INDEX IF NOT EXISTS idx_dreams_journal_date ON dreams(journal_id, dream_date DESC);
    CREATE INDEX IF NOT EXISTS idx_dreams_journal_created ON dreams(journal_id, created_at DESC);
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
