//! SQLite-backed record store.
//!
//! # Invariants
//! - One row per collection in `record_collections`; payload is a JSON array.
//! - A non-array payload is rejected instead of masked as empty.

use super::{Collection, Record, RecordStore, StoreError, StoreResult};
use crate::db::{open_db, open_db_in_memory};
use log::{debug, error};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Record store persisting each collection as one JSON row.
pub struct SqliteRecordStore {
    conn: Connection,
}

impl SqliteRecordStore {
    /// Wraps a connection that already has migrations applied.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Opens (or creates) a database file and applies migrations.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    /// Opens a fresh in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    /// Borrows the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl RecordStore for SqliteRecordStore {
    fn read(&self, collection: Collection) -> StoreResult<Vec<Record>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM record_collections WHERE name = ?1;",
                [collection.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(payload) = payload else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Record>(&payload)? {
            Record::Array(records) => {
                debug!(
                    "event=store_read module=store status=ok collection={} count={}",
                    collection,
                    records.len()
                );
                Ok(records)
            }
            _ => {
                error!(
                    "event=store_read module=store status=error collection={collection} error_code=payload_not_array"
                );
                Err(StoreError::InvalidData {
                    collection,
                    message: "payload is not a JSON array".to_string(),
                })
            }
        }
    }

    fn write(&self, collection: Collection, records: &[Record]) -> StoreResult<()> {
        let payload = serde_json::to_string(records)?;
        self.conn.execute(
            "INSERT INTO record_collections (name, payload)
             VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET
                payload = excluded.payload,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![collection.as_str(), payload],
        )?;

        debug!(
            "event=store_write module=store status=ok collection={} count={}",
            collection,
            records.len()
        );
        Ok(())
    }
}
