//! Local key-value stores backing snapshot persistence.
//!
//! `KeyValueStore` mirrors a browser-style string store: one string value per
//! key, optional capacity limit, no transactions across keys.

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use smartcal_core::{RusqliteErrorExt, StorageError};

/// Result type for key-value operations.
pub type KvResult<T> = Result<T, StorageError>;

/// String key-value storage.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> KvResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns `StorageError::QuotaExceeded` when the value does not fit.
    fn set(&self, key: &str, value: &str) -> KvResult<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> KvResult<()>;

    fn contains(&self, key: &str) -> KvResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

fn check_quota(quota: Option<usize>, used_elsewhere: usize, value: &str) -> KvResult<()> {
    if let Some(limit) = quota {
        let needed = used_elsewhere + value.len();
        if needed > limit {
            return Err(StorageError::QuotaExceeded { needed, limit });
        }
    }
    Ok(())
}

/// SQLite-backed key-value store.
pub struct SqliteKeyValueStore {
    conn: Mutex<Connection>,
    quota_bytes: Option<usize>,
}

impl SqliteKeyValueStore {
    /// Open (or create) a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P, quota_bytes: Option<usize>) -> KvResult<Self> {
        let conn = Connection::open(path).map_err(RusqliteErrorExt::into_storage_error)?;
        Self::with_connection(conn, quota_bytes)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory(quota_bytes: Option<usize>) -> KvResult<Self> {
        let conn = Connection::open_in_memory().map_err(RusqliteErrorExt::into_storage_error)?;
        Self::with_connection(conn, quota_bytes)
    }

    fn with_connection(conn: Connection, quota_bytes: Option<usize>) -> KvResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(RusqliteErrorExt::into_storage_error)?;

        Ok(Self {
            conn: Mutex::new(conn),
            quota_bytes,
        })
    }

    fn used_bytes_except(conn: &Connection, key: &str) -> KvResult<usize> {
        let used: i64 = conn
            .query_row(
                "SELECT COALESCE(SUM(LENGTH(CAST(value AS BLOB))), 0) FROM kv WHERE key != ?1",
                params![key],
                |row| row.get(0),
            )
            .map_err(RusqliteErrorExt::into_storage_error)?;
        Ok(usize::try_from(used).unwrap_or(0))
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        self.conn
            .lock()
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(RusqliteErrorExt::into_storage_error)
    }

    fn set(&self, key: &str, value: &str) -> KvResult<()> {
        let conn = self.conn.lock();
        if self.quota_bytes.is_some() {
            let used = Self::used_bytes_except(&conn, key)?;
            check_quota(self.quota_bytes, used, value)?;
        }

        conn.execute(
            r#"
            INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value, Utc::now().to_rfc3339()],
        )
        .map_err(RusqliteErrorExt::into_storage_error)?;

        tracing::debug!("Stored {} bytes under {}", value.len(), key);
        Ok(())
    }

    fn remove(&self, key: &str) -> KvResult<()> {
        self.conn
            .lock()
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(RusqliteErrorExt::into_storage_error)?;
        Ok(())
    }
}

/// In-memory key-value store.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> KvResult<()> {
        let mut entries = self.entries.lock();
        let used = entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(_, v)| v.len())
            .sum();
        check_quota(self.quota_bytes, used, value)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> KvResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
