//! Key-value backends for persisted state.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{StoreError, StoreResult};

/// Asynchronous key-value storage.
///
/// `get` returns `None` for keys that were never written.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> StoreResult<()>;
}

/// SQLite-backed store. Values are kept as JSON text in a single table.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database.
    #[cfg(test)]
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn lock(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    match conn.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("sqlite connection mutex poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let conn = Arc::clone(&self.conn);
        let owned_key = key.to_string();

        let raw: Option<String> = tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            conn.query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![owned_key],
                |row| row.get(0),
            )
            .optional()
        })
        .await??;

        raw.map(|text| {
            serde_json::from_str(&text).map_err(|source| StoreError::Malformed {
                key: key.to_string(),
                source,
            })
        })
        .transpose()
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        let conn = Arc::clone(&self.conn);
        let owned_key = key.to_string();
        let text = value.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            conn.execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![owned_key, text],
            )
        })
        .await??;

        Ok(())
    }
}

/// Volatile store used for `--ephemeral` runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let values = self.values.lock().unwrap_or_else(|p| p.into_inner());
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        let mut values = self.values.lock().unwrap_or_else(|p| p.into_inner());
        values.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_sqlite_missing_key_is_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.get("list").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sqlite_set_then_get() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set("list", json!(["b", "a"])).await.unwrap();
        store.set("list", json!(["c", "b", "a"])).await.unwrap();

        assert_eq!(
            store.get("list").await.unwrap(),
            Some(json!(["c", "b", "a"]))
        );
    }

    #[tokio::test]
    async fn test_sqlite_persists_across_reopen() {
        let dir = std::env::temp_dir().join(format!("kclip-kv-test-{}", std::process::id()));
        let path = dir.join("history.db");
        let _ = std::fs::remove_file(&path);

        {
            let store = SqliteStore::open(&path).unwrap();
            store.set("list", json!(["kept"])).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get("list").await.unwrap(), Some(json!(["kept"])));

        drop(store);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_sqlite_malformed_value() {
        let store = SqliteStore::open_in_memory().unwrap();
        lock(&store.conn)
            .execute(
                "INSERT INTO kv (key, value) VALUES ('list', 'not json')",
                [],
            )
            .unwrap();

        let err = store.get("list").await.unwrap_err();
        assert!(matches!(err, StoreError::Malformed { ref key, .. } if key == "list"));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get("list").await.unwrap(), None);
        store.set("list", json!([])).await.unwrap();
        assert_eq!(store.get("list").await.unwrap(), Some(json!([])));
    }
}
