//! Key/value backends holding the serialized ledger.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use tracing::{debug, info, instrument};

use crate::error::{Result, SnapError};

/// SQLite schema: a single string-keyed table of text blobs.
const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

/// How long a writer waits for another process holding the database lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// String blob storage addressed by key.
///
/// Implementations are owned by exactly one ledger worker, so they need
/// `Send` but not `Sync`.
pub trait KvStore: Send + 'static {
    /// Read the blob stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the blob stored under `key`.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Read-modify-write of `key` as one atomic step, also against other
    /// processes sharing the backing file. Nothing is written if `apply`
    /// fails.
    fn update<F>(&mut self, key: &str, apply: F) -> Result<()>
    where
        F: FnOnce(Option<String>) -> Result<String>;
}

/// SQLite-backed store.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates a database at the given path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SnapError::Storage(format!(
                    "Failed to create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        debug!("Opening ledger database");
        let conn = Connection::open(path)
            .map_err(|e| SnapError::Storage(format!("Failed to open database: {e}")))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| SnapError::Storage(format!("Failed to set busy timeout: {e}")))?;

        let store = Self { conn };
        store.init_schema()?;
        info!(path = %path.display(), "Ledger database ready");
        Ok(store)
    }

    /// Creates an in-memory database.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            SnapError::Storage(format!("Failed to create in-memory database: {e}"))
        })?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA_SQL)
            .map_err(|e| SnapError::Storage(format!("Failed to initialize schema: {e}")))
    }
}

fn read_value(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
        row.get(0)
    })
    .optional()
    .map_err(|e| SnapError::Storage(format!("Failed to read '{key}': {e}")))
}

fn write_value(conn: &Connection, key: &str, value: &str) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, now],
    )
    .map_err(|e| SnapError::Storage(format!("Failed to write '{key}': {e}")))?;
    Ok(())
}

impl KvStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        read_value(&self.conn, key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        write_value(&self.conn, key, value)
    }

    fn update<F>(&mut self, key: &str, apply: F) -> Result<()>
    where
        F: FnOnce(Option<String>) -> Result<String>,
    {
        // IMMEDIATE takes the write lock before reading, so a second process
        // waits here instead of working from a stale list.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| SnapError::Storage(format!("Failed to lock '{key}': {e}")))?;
        let next = apply(read_value(&tx, key)?)?;
        write_value(&tx, key, &next)?;
        tx.commit()
            .map_err(|e| SnapError::Storage(format!("Failed to commit '{key}': {e}")))
    }
}

/// Volatile store for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one value.
    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut store = Self::default();
        store.values.insert(key.into(), value.into());
        store
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn update<F>(&mut self, key: &str, apply: F) -> Result<()>
    where
        F: FnOnce(Option<String>) -> Result<String>,
    {
        let next = apply(self.values.get(key).cloned())?;
        self.values.insert(key.to_string(), next);
        Ok(())
    }
}
