//! In-memory lease store backend.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::store::{LeaseQuery, LeaseRecord, LeaseStore, LeaseUpdate, WriteConcern};
use crate::core::StoreError;

/// Lease collection held in process memory.
///
/// Clones are handles onto the same records, each with its own write
/// concern, so several mutexes (and threads) can share one collection. Every
/// operation runs under a single map lock, which gives per-record atomicity.
#[derive(Debug, Clone)]
pub struct InMemoryLeaseStore {
    records: Arc<Mutex<HashMap<String, LeaseRecord>>>,
    write_concern: WriteConcern,
}

impl InMemoryLeaseStore {
    /// Create an empty collection with acknowledged writes.
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            write_concern: WriteConcern::Acknowledged,
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether no records are stored.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Snapshot of every record, ordered by key.
    pub fn records(&self) -> Vec<LeaseRecord> {
        let mut records: Vec<_> = self.records.lock().values().cloned().collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        records
    }

    /// Drop every record.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl Default for InMemoryLeaseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LeaseStore for InMemoryLeaseStore {
    fn insert(&self, record: &LeaseRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock();
        if records.contains_key(&record.key) {
            return match self.write_concern {
                WriteConcern::Acknowledged => Err(StoreError::DuplicateKey(record.key.clone())),
                WriteConcern::Unacknowledged => Ok(()),
            };
        }
        records.insert(record.key.clone(), record.clone());
        Ok(())
    }

    fn find_and_delete(&self, query: &LeaseQuery) -> Result<Option<LeaseRecord>, StoreError> {
        let mut records = self.records.lock();
        let matched = records.get(&query.key).is_some_and(|r| query.matches(r));
        Ok(if matched { records.remove(&query.key) } else { None })
    }

    fn find_and_update(
        &self,
        query: &LeaseQuery,
        update: &LeaseUpdate,
    ) -> Result<Option<LeaseRecord>, StoreError> {
        let mut records = self.records.lock();
        Ok(records
            .get_mut(&query.key)
            .filter(|r| query.matches(r))
            .map(|r| {
                let previous = r.clone();
                update.apply(r);
                previous
            }))
    }

    fn find_one(&self, query: &LeaseQuery) -> Result<Option<LeaseRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .get(&query.key)
            .filter(|r| query.matches(r))
            .cloned())
    }

    fn write_concern(&self) -> WriteConcern {
        self.write_concern
    }

    fn with_write_concern(&self, concern: WriteConcern) -> Self {
        Self {
            records: Arc::clone(&self.records),
            write_concern: concern,
        }
    }
}
