use super::notify::ChangeNotifier;
use super::traits::{ChangeSet, KeyValueStore, StoreMap};
use crate::error::{BlockerError, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::info;

/// Durable store keeping each value as JSON text in a single `kv` table.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    notifier: ChangeNotifier,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL DEFAULT (strftime('%s','now'))
            )",
            [],
        )?;
        info!("SQLite store ready");
        Ok(Self {
            conn: Mutex::new(conn),
            notifier: ChangeNotifier::new(),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| BlockerError::Store("sqlite connection lock poisoned".to_string()))
    }

    fn read(conn: &Connection, key: &str) -> Result<Option<Value>> {
        let raw: Option<String> = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }
}

#[async_trait::async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, keys: &[&str]) -> Result<StoreMap> {
        let conn = self.lock()?;
        let mut out = StoreMap::new();
        for key in keys {
            if let Some(value) = Self::read(&conn, key)? {
                out.insert(key.to_string(), value);
            }
        }
        Ok(out)
    }

    async fn set(&self, items: StoreMap) -> Result<()> {
        let mut changes = ChangeSet::new();
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            for (key, value) in items {
                let old = Self::read(&tx, &key)?;
                tx.execute(
                    "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, strftime('%s','now'))
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                    params![key, serde_json::to_string(&value)?],
                )?;
                ChangeNotifier::record(&mut changes, &key, old, Some(value));
            }
            tx.commit()?;
        }
        self.notifier.publish(changes);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let mut changes = ChangeSet::new();
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            for key in keys {
                let old = Self::read(&tx, key)?;
                tx.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
                ChangeNotifier::record(&mut changes, key, old, None);
            }
            tx.commit()?;
        }
        self.notifier.publish(changes);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeSet> {
        self.notifier.subscribe()
    }
}
