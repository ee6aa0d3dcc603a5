//! v001 -- Initial schema creation.
//!
//! Creates the `assignments` table: one row per Body Assignment holding the
//! whole tree as a JSON document, plus the columns used for listing.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Body assignments
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS assignments (
    id          TEXT PRIMARY KEY NOT NULL,    -- document _id
    title       TEXT NOT NULL,
    description TEXT,
    published   INTEGER NOT NULL DEFAULT 0,   -- boolean 0/1
    version     INTEGER NOT NULL,             -- optimistic-concurrency token
    document    TEXT NOT NULL,                -- full aggregate as JSON
    created_at  TEXT NOT NULL,                -- RFC-3339, fixed width UTC
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_assignments_published_created
    ON assignments(published, created_at DESC);

CREATE INDEX IF NOT EXISTS idx_assignments_updated
    ON assignments(updated_at DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
