//! Record store abstraction over named collections.
//!
//! # Responsibility
//! - Define the read/write contract every persistence backend implements.
//! - Provide typed (serde) helpers on top of raw JSON records.
//!
//! # Invariants
//! - Reading a collection that was never written yields an empty list.
//! - `write` replaces the whole collection; there is no merge.
//! - Read-modify-write cycles are not atomic across callers.

use crate::db::DbError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

mod memory;
mod sqlite;

pub use memory::MemoryRecordStore;
pub use sqlite::SqliteRecordStore;

/// One stored record. Shapes are owned by the repositories.
pub type Record = serde_json::Value;

pub type StoreResult<T> = Result<T, StoreError>;

/// Fixed set of logical collection names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    Accounts,
    Tasks,
    /// Holds zero or one persisted session token.
    Session,
}

impl Collection {
    /// Stable storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accounts => "accounts",
            Self::Tasks => "tasks",
            Self::Session => "session",
        }
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage-layer failure.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    Serialization(serde_json::Error),
    InvalidData {
        collection: Collection,
        message: String,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "record serialization failed: {err}"),
            Self::InvalidData {
                collection,
                message,
            } => write!(f, "invalid stored data in `{collection}`: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::InvalidData { .. } => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Key-value persistence of whole record collections.
pub trait RecordStore {
    fn read(&self, collection: Collection) -> StoreResult<Vec<Record>>;
    fn write(&self, collection: Collection, records: &[Record]) -> StoreResult<()>;
}

impl<S: RecordStore + ?Sized> RecordStore for &S {
    fn read(&self, collection: Collection) -> StoreResult<Vec<Record>> {
        (**self).read(collection)
    }

    fn write(&self, collection: Collection, records: &[Record]) -> StoreResult<()> {
        (**self).write(collection, records)
    }
}

impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    fn read(&self, collection: Collection) -> StoreResult<Vec<Record>> {
        (**self).read(collection)
    }

    fn write(&self, collection: Collection, records: &[Record]) -> StoreResult<()> {
        (**self).write(collection, records)
    }
}

/// Reads a collection and decodes every record as `T`.
///
/// A record that does not decode is reported as `InvalidData` instead of
/// being skipped.
pub fn read_records<T, S>(store: &S, collection: Collection) -> StoreResult<Vec<T>>
where
    T: DeserializeOwned,
    S: RecordStore + ?Sized,
{
    store
        .read(collection)?
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            serde_json::from_value(record).map_err(|err| StoreError::InvalidData {
                collection,
                message: format!("record {index}: {err}"),
            })
        })
        .collect()
}

/// Encodes `records` and replaces the collection with them.
pub fn write_records<T, S>(store: &S, collection: Collection, records: &[T]) -> StoreResult<()>
where
    T: Serialize,
    S: RecordStore + ?Sized,
{
    let encoded = records
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    store.write(collection, &encoded)
}
