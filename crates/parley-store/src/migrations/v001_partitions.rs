//! v001 -- Partition table.
//!
//! The whole simulated backend is a flat key -> JSON document map.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS partitions (
    key        TEXT PRIMARY KEY NOT NULL,   -- e.g. 'accounts.profiles', 'ledger.12345678'
    value      TEXT NOT NULL,               -- whole JSON document
    updated_at TEXT NOT NULL                -- RFC-3339
);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
