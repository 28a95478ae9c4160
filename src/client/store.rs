//! SQLite-backed key-value store for client state
//!
//! Each logical store (drafts, collection, preferences) owns one namespace
//! named `<store>@v<version>`. Values are JSON. Writes are last-write-wins.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::FolioError;

/// Name and schema version of a persisted store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreName {
    pub name: &'static str,
    pub version: u32,
}

impl StoreName {
    pub const fn new(name: &'static str, version: u32) -> Self {
        Self { name, version }
    }

    pub fn namespace(&self) -> String {
        format!("{}@v{}", self.name, self.version)
    }
}

impl From<rusqlite::Error> for FolioError {
    fn from(e: rusqlite::Error) -> Self {
        FolioError::Storage(e.to_string())
    }
}

/// Shared handle to the client database
#[derive(Clone)]
pub struct KvStore {
    db: Arc<Mutex<Connection>>,
}

impl KvStore {
    /// Open or create `client.db` in `data_dir`
    pub fn open(data_dir: &Path) -> Result<Self, FolioError> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join("client.db");
        let db = Connection::open(&db_path)?;

        db.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(&db)?;

        info!(path = %db_path.display(), "Client store opened");
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    /// In-memory database (tests, throwaway sessions)
    pub fn in_memory() -> Result<Self, FolioError> {
        let db = Connection::open_in_memory()?;
        Self::init(&db)?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    fn init(db: &Connection) -> Result<(), FolioError> {
        db.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (namespace, key)
            );",
        )?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-write leaves SQLite consistent, so a poisoned lock is still usable
        self.db.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get<T: DeserializeOwned>(&self, store: StoreName, key: &str) -> Result<Option<T>, FolioError> {
        let db = self.conn();
        let raw: Option<String> = db
            .prepare_cached("SELECT value FROM kv WHERE namespace = ?1 AND key = ?2")?
            .query_row(params![store.namespace(), key], |row| row.get(0))
            .optional()?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn put<T: Serialize>(&self, store: StoreName, key: &str, value: &T) -> Result<(), FolioError> {
        let json = serde_json::to_string(value)?;
        let db = self.conn();
        db.execute(
            "INSERT INTO kv (namespace, key, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(namespace, key) DO UPDATE SET value = ?3, updated_at = ?4",
            params![store.namespace(), key, json, crate::models::now_millis()],
        )?;
        debug!(namespace = %store.namespace(), key, bytes = json.len(), "Stored value");
        Ok(())
    }

    /// Returns whether a row was removed
    pub fn delete(&self, store: StoreName, key: &str) -> Result<bool, FolioError> {
        let db = self.conn();
        let removed = db.execute(
            "DELETE FROM kv WHERE namespace = ?1 AND key = ?2",
            params![store.namespace(), key],
        )?;
        Ok(removed > 0)
    }

    /// All values in a namespace, ordered by key
    pub fn list<T: DeserializeOwned>(&self, store: StoreName) -> Result<Vec<(String, T)>, FolioError> {
        let db = self.conn();
        let mut stmt = db.prepare_cached("SELECT key, value FROM kv WHERE namespace = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![store.namespace()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (key, json) = row?;
            out.push((key, serde_json::from_str(&json)?));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const A: StoreName = StoreName::new("test.a", 1);
    const A2: StoreName = StoreName::new("test.a", 2);
    const B: StoreName = StoreName::new("test.b", 1);

    #[test]
    fn test_namespace() {
        assert_eq!(A.namespace(), "test.a@v1");
    }

    #[test]
    fn test_put_get_delete() {
        let kv = KvStore::in_memory().unwrap();
        assert_eq!(kv.get::<String>(A, "k").unwrap(), None);

        kv.put(A, "k", &"first".to_string()).unwrap();
        kv.put(A, "k", &"second".to_string()).unwrap();
        assert_eq!(kv.get::<String>(A, "k").unwrap().as_deref(), Some("second"));

        assert!(kv.delete(A, "k").unwrap());
        assert!(!kv.delete(A, "k").unwrap());
        assert_eq!(kv.get::<String>(A, "k").unwrap(), None);
    }

    #[test]
    fn test_namespaces_and_versions_are_isolated() {
        let kv = KvStore::in_memory().unwrap();
        kv.put(A, "k", &1u32).unwrap();
        kv.put(A2, "k", &2u32).unwrap();
        kv.put(B, "k", &3u32).unwrap();

        assert_eq!(kv.get::<u32>(A, "k").unwrap(), Some(1));
        assert_eq!(kv.get::<u32>(A2, "k").unwrap(), Some(2));
        assert_eq!(kv.list::<u32>(B).unwrap(), vec![("k".to_string(), 3)]);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let kv = KvStore::open(dir.path()).unwrap();
            kv.put(A, "theme", &"dark".to_string()).unwrap();
        }
        let kv = KvStore::open(dir.path()).unwrap();
        assert_eq!(kv.get::<String>(A, "theme").unwrap().as_deref(), Some("dark"));
    }
}
