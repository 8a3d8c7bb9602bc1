//! SQLite table layout.
//!
//! The database holds a single key-value table. Record layout changes are
//! tracked by the store under [`crate::keys::SCHEMA_VERSION`], which works
//! the same for every backend, so the table itself is not versioned.

use rusqlite::Connection;

use crate::error::Result;

/// Create the `kv` table if it does not exist yet.
pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per storage key, value is the JSON document
        CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );
        "#,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_initialize_fresh_database() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        assert_eq!(tables(&conn), vec!["kv"]);
    }

    #[test]
    fn test_initialize_keeps_existing_rows() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES ('krishimitra_last_sync', '5', 5)",
            [],
        )
        .unwrap();

        // Re-initializing is a no-op
        initialize(&conn).unwrap();
        let value: String = conn
            .query_row("SELECT value FROM kv WHERE key = 'krishimitra_last_sync'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(value, "5");
    }
}
