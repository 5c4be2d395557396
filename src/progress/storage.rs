//! Durable key/value storage for the serialized snapshot

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage lock poisoned")]
    Poisoned,
}

/// Where the progress record lives
pub trait SnapshotStorage: Send + Sync {
    /// Value stored under `key`, `None` if absent
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or replace the value under `key`
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// SQLite-backed storage, one row per key
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open (or create) the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::init_schema(&conn)?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn init_schema(conn: &Connection) -> Result<(), StorageError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
        "#,
        )?;
        Ok(())
    }
}

impl SnapshotStorage for SqliteStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let value = conn
            .query_row("SELECT value FROM kv_store WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        conn.execute(
            r#"INSERT OR REPLACE INTO kv_store (key, value, updated_at)
               VALUES (?1, ?2, ?3)"#,
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

/// Process-local storage; nothing survives a restart
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sqlite_read_and_overwrite() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::open(dir.path().join("progress.db")).unwrap();

        assert_eq!(storage.read("k").unwrap(), None);
        storage.write("k", "one").unwrap();
        storage.write("k", "two").unwrap();
        assert_eq!(storage.read("k").unwrap().as_deref(), Some("two"));
        assert_eq!(storage.read("other").unwrap(), None);
    }

    #[test]
    fn test_sqlite_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("progress.db");
        {
            let storage = SqliteStorage::open(&path).unwrap();
            storage.write("learner", "{}").unwrap();
        }
        let reopened = SqliteStorage::open(&path).unwrap();
        assert_eq!(reopened.read("learner").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        storage.write("a", "1").unwrap();
        assert_eq!(storage.read("a").unwrap().as_deref(), Some("1"));
        assert_eq!(storage.read("b").unwrap(), None);
    }
}
