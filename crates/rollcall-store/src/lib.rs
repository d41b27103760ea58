mod locator;
mod memory;

pub use locator::{locate, locate_record};
pub use memory::MemoryStore;

use rollcall_types::UserRecord;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("user not found: {name}")]
    NotFound { name: String },
}

impl StoreError {
    pub fn not_found(name: &str) -> Self {
        StoreError::NotFound {
            name: name.to_string(),
        }
    }
}

/// Ordered record storage. Every name-keyed operation resolves to the first
/// record with that name in store order.
pub trait RecordStore: Send + Sync {
    fn list(&self) -> Vec<UserRecord>;

    fn find_by_name(&self, name: &str) -> Result<UserRecord, StoreError>;

    fn find_index_by_name(&self, name: &str) -> Result<usize, StoreError>;

    fn insert(&self, record: UserRecord);

    /// Replaces every field of the first record named `name`.
    fn replace(&self, name: &str, record: UserRecord) -> Result<UserRecord, StoreError>;

    /// Removes the first record named `name`, keeping the order of the rest.
    fn remove(&self, name: &str) -> Result<UserRecord, StoreError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
