use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use rollcall_types::UserRecord;
use tracing::debug;

use crate::locator::{locate, locate_record};
use crate::{RecordStore, StoreError};

/// In-process store. Mutations are serialized behind a single lock; nothing
/// survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<UserRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<UserRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<UserRecord>> {
        self.records.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<UserRecord>> {
        self.records.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl RecordStore for MemoryStore {
    fn list(&self) -> Vec<UserRecord> {
        self.read().clone()
    }

    fn find_by_name(&self, name: &str) -> Result<UserRecord, StoreError> {
        let records = self.read();
        locate_record(&records, name)
            .cloned()
            .ok_or_else(|| StoreError::not_found(name))
    }

    fn find_index_by_name(&self, name: &str) -> Result<usize, StoreError> {
        locate(&self.read(), name).ok_or_else(|| StoreError::not_found(name))
    }

    fn insert(&self, record: UserRecord) {
        let mut records = self.write();
        debug!("Inserting {} at position {}", record.name, records.len());
        records.push(record);
    }

    fn replace(&self, name: &str, record: UserRecord) -> Result<UserRecord, StoreError> {
        let mut records = self.write();
        let index = locate(&records, name).ok_or_else(|| StoreError::not_found(name))?;
        debug!("Replacing {} at position {}", name, index);
        records[index] = record.clone();
        Ok(record)
    }

    fn remove(&self, name: &str) -> Result<UserRecord, StoreError> {
        let mut records = self.write();
        let index = locate(&records, name).ok_or_else(|| StoreError::not_found(name))?;
        debug!("Removing {} at position {}", name, index);
        Ok(records.remove(index))
    }

    fn len(&self) -> usize {
        self.read().len()
    }
}
