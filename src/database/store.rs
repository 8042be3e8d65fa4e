//! Named JSON records on top of SQLite.
//!
//! Every record is read and written whole. [`KeyValueStore::update`] holds the
//! connection lock and a transaction across the read and the write, so two
//! handlers mutating the same record merge instead of overwriting each other.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::migrations;
use crate::types::errors::StoreError;

/// Record holding the per-tab refresh map.
pub const REFRESH_DATA_KEY: &str = "refreshData";
/// Record holding the rotation singleton.
pub const ROTATION_DATA_KEY: &str = "rotationData";
/// Record holding the ordered default-tab list.
pub const DEFAULT_TABS_KEY: &str = "defaultTabs";

/// A SQLite connection with every migration applied.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        Self::migrated(Connection::open(path)?)
    }

    /// Schema is applied but nothing outlives the value.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        Self::migrated(Connection::open_in_memory()?)
    }

    fn migrated(conn: Connection) -> Result<Self, rusqlite::Error> {
        migrations::run_all(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

pub struct KeyValueStore {
    db: Mutex<Database>,
}

impl KeyValueStore {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>, StoreError> {
        self.db.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Reads a record, falling back to `default` when it is absent or undecodable.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, StoreError> {
        let db = self.lock()?;
        Ok(decode_or(key, read_raw(db.connection(), key)?, default))
    }

    /// Replaces a record wholesale.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let db = self.lock()?;
        write_raw(db.connection(), key, &encode(value)?)
    }

    /// Atomic read-modify-write of one record.
    ///
    /// `f` runs while the connection is locked. It must not block on anything
    /// else that needs the store.
    pub fn update<T, R, F>(&self, key: &str, default: T, f: F) -> Result<R, StoreError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T) -> R,
    {
        let db = self.lock()?;
        let conn = db.connection();
        let tx = conn.unchecked_transaction()?;
        let mut value = decode_or(key, read_raw(conn, key)?, default);
        let result = f(&mut value);
        write_raw(conn, key, &encode(&value)?)?;
        tx.commit()?;
        Ok(result)
    }

    /// Deletes a record. Returns whether it existed.
    pub fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let db = self.lock()?;
        let changed = db
            .connection()
            .execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(changed > 0)
    }

    /// Whether a record with this key has ever been written.
    pub fn contains(&self, key: &str) -> Result<bool, StoreError> {
        let db = self.lock()?;
        Ok(read_raw(db.connection(), key)?.is_some())
    }
}

fn read_raw(conn: &Connection, key: &str) -> Result<Option<String>, StoreError> {
    let raw = conn
        .query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(raw)
}

fn write_raw(conn: &Connection, key: &str, json: &str) -> Result<(), StoreError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64;
    conn.execute(
        "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, json, now],
    )?;
    Ok(())
}

fn encode<T: Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::SerializationError(e.to_string()))
}

fn decode_or<T: DeserializeOwned>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(json) => match serde_json::from_str(&json) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding undecodable record");
                default
            }
        },
    }
}
