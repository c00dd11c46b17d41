//! Process-local record store.

use super::{Collection, Record, RecordStore, StoreResult};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-memory record store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    collections: Mutex<BTreeMap<Collection, Vec<Record>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<Collection, Vec<Record>>> {
        // Poison is ignored: `write` swaps a whole vector in one assignment.
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl RecordStore for MemoryRecordStore {
    fn read(&self, collection: Collection) -> StoreResult<Vec<Record>> {
        Ok(self.lock().get(&collection).cloned().unwrap_or_default())
    }

    fn write(&self, collection: Collection, records: &[Record]) -> StoreResult<()> {
        self.lock().insert(collection, records.to_vec());
        Ok(())
    }
}
