//! SQLite key-value backend.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use krishimitra_types::now_millis;

use crate::backend::KvBackend;
use crate::error::{Error, Result};
use crate::schema;

/// Durable backend storing each key as a row in a `kv` table.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }
}

impl KvBackend for SqliteBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value = ?2,
                updated_at = ?3",
            rusqlite::params![key, value, now_millis()],
        )?;
        debug!("Wrote {} bytes to {}", value.len(), key);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_overwrite() {
        let mut backend = SqliteBackend::open_in_memory().unwrap();
        assert_eq!(backend.get("krishimitra_weather").unwrap(), None);

        backend.set("krishimitra_weather", "[]").unwrap();
        backend.set("krishimitra_weather", "[1]").unwrap();
        assert_eq!(
            backend.get("krishimitra_weather").unwrap(),
            Some("[1]".to_string())
        );
        assert_eq!(backend.keys().unwrap(), vec!["krishimitra_weather"]);
    }

    #[test]
    fn test_remove() {
        let mut backend = SqliteBackend::open_in_memory().unwrap();
        backend.set("a", "1").unwrap();
        backend.remove("a").unwrap();
        backend.remove("missing").unwrap();
        assert!(backend.keys().unwrap().is_empty());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("offline.db");

        {
            let mut backend = SqliteBackend::open(&path).unwrap();
            backend.set("krishimitra_last_sync", "1700000000000").unwrap();
        }

        let backend = SqliteBackend::open(&path).unwrap();
        assert_eq!(
            backend.get("krishimitra_last_sync").unwrap(),
            Some("1700000000000".to_string())
        );
    }
}
