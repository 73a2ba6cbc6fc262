//! File-backed lease store.
//!
//! A collection is one JSON array of lease records at
//! `<dir>/<collection>.json`. Every operation takes an exclusive advisory
//! lock on `<dir>/<collection>.lock` for its whole read-modify-write, so the
//! store is atomic across threads and across processes sharing the
//! directory. Rewrites go to a sibling temp file that is renamed over the
//! collection file.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::trace;

use crate::core::store::{LeaseQuery, LeaseRecord, LeaseStore, LeaseUpdate, WriteConcern};
use crate::core::StoreError;

type Records = BTreeMap<String, LeaseRecord>;

/// Lease collection persisted as a JSON file.
#[derive(Debug, Clone)]
pub struct FileLeaseStore {
    dir: PathBuf,
    collection: String,
    write_concern: WriteConcern,
}

impl FileLeaseStore {
    /// Open (creating if needed) `collection` under `dir`.
    pub fn new(dir: impl AsRef<Path>, collection: impl Into<String>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            collection: collection.into(),
            write_concern: WriteConcern::Acknowledged,
        })
    }

    /// Path of the collection's data file.
    pub fn data_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.collection))
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(format!("{}.lock", self.collection))
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json.tmp", self.collection))
    }

    /// Snapshot of every record, ordered by key.
    pub fn records(&self) -> Result<Vec<LeaseRecord>, StoreError> {
        self.locked(|records| Ok((records.values().cloned().collect(), false)))
    }

    /// Run `f` over the records under the collection lock, persisting them
    /// afterwards if `f` reports a change. The lock is released when the
    /// lock file handle is closed, on every return path.
    fn locked<T>(
        &self,
        f: impl FnOnce(&mut Records) -> Result<(T, bool), StoreError>,
    ) -> Result<T, StoreError> {
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(self.lock_path())?;
        FileExt::lock_exclusive(&lock)?;

        let mut records = self.load()?;
        let (out, changed) = f(&mut records)?;
        if changed {
            self.persist(&records)?;
        }
        Ok(out)
    }

    fn load(&self) -> Result<Records, StoreError> {
        let file = match File::open(self.data_path()) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Records::new()),
            Err(e) => return Err(e.into()),
        };
        if file.metadata()?.len() == 0 {
            return Ok(Records::new());
        }
        let list: Vec<LeaseRecord> = serde_json::from_reader(BufReader::new(file))?;
        Ok(list.into_iter().map(|r| (r.key.clone(), r)).collect())
    }

    fn persist(&self, records: &Records) -> Result<(), StoreError> {
        let temp = self.temp_path();
        let file = File::create(&temp)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &records.values().collect::<Vec<_>>())?;
        writer.flush()?;
        if self.write_concern == WriteConcern::Acknowledged {
            writer.get_ref().sync_all()?;
        }
        drop(writer);
        fs::rename(&temp, self.data_path())?;
        trace!(collection = %self.collection, records = records.len(), "persisted lease collection");
        Ok(())
    }
}

impl LeaseStore for FileLeaseStore {
    fn insert(&self, record: &LeaseRecord) -> Result<(), StoreError> {
        let acknowledged = self.write_concern == WriteConcern::Acknowledged;
        self.locked(|records| {
            if records.contains_key(&record.key) {
                return if acknowledged {
                    Err(StoreError::DuplicateKey(record.key.clone()))
                } else {
                    Ok(((), false))
                };
            }
            records.insert(record.key.clone(), record.clone());
            Ok(((), true))
        })
    }

    fn find_and_delete(&self, query: &LeaseQuery) -> Result<Option<LeaseRecord>, StoreError> {
        self.locked(|records| {
            let matched = records.get(&query.key).is_some_and(|r| query.matches(r));
            if matched {
                Ok((records.remove(&query.key), true))
            } else {
                Ok((None, false))
            }
        })
    }

    fn find_and_update(
        &self,
        query: &LeaseQuery,
        update: &LeaseUpdate,
    ) -> Result<Option<LeaseRecord>, StoreError> {
        self.locked(|records| {
            let previous = records
                .get_mut(&query.key)
                .filter(|r| query.matches(r))
                .map(|r| {
                    let previous = r.clone();
                    update.apply(r);
                    previous
                });
            let changed = previous.is_some();
            Ok((previous, changed))
        })
    }

    fn find_one(&self, query: &LeaseQuery) -> Result<Option<LeaseRecord>, StoreError> {
        self.locked(|records| {
            let found = records.get(&query.key).filter(|r| query.matches(r)).cloned();
            Ok((found, false))
        })
    }

    fn write_concern(&self) -> WriteConcern {
        self.write_concern
    }

    fn with_write_concern(&self, concern: WriteConcern) -> Self {
        Self {
            write_concern: concern,
            ..self.clone()
        }
    }
}
