//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use lease_mutex::core::{LeaseQuery, LeaseUpdate};
use lease_mutex::{
    InMemoryLeaseStore, LeaseMutex, LeaseRecord, LeaseStore, ManualClock, MutexBuilder,
    StoreError, Timestamp, WriteConcern,
};

pub const KEY: &str = "/path-to/some-doc";

/// Fixed starting instant, with a sub-second part.
pub fn t0() -> Timestamp {
    Timestamp::from_millis(1_234_567_890_123)
}

/// Health of a [`FaultyStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Health {
    Online = 0,
    /// Every call fails with a connection error.
    Disconnected = 1,
    /// Every call fails with a non-transient I/O error.
    Broken = 2,
    /// Every call fails with an interrupted I/O error.
    Interrupted = 3,
}

/// In-memory store whose availability can be switched off mid-test.
#[derive(Debug, Clone)]
pub struct FaultyStore {
    inner: InMemoryLeaseStore,
    health: Arc<AtomicU8>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryLeaseStore::new(),
            health: Arc::new(AtomicU8::new(Health::Online as u8)),
        }
    }

    pub fn set_health(&self, health: Health) {
        self.health.store(health as u8, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &InMemoryLeaseStore {
        &self.inner
    }

    fn check(&self) -> Result<(), StoreError> {
        match self.health.load(Ordering::SeqCst) {
            0 => Ok(()),
            1 => Err(StoreError::Connection("connection refused".into())),
            3 => Err(StoreError::Io(std::io::ErrorKind::Interrupted.into())),
            _ => Err(StoreError::Io(std::io::Error::other("disk on fire"))),
        }
    }
}

impl LeaseStore for FaultyStore {
    fn insert(&self, record: &LeaseRecord) -> Result<(), StoreError> {
        self.check()?;
        self.inner.insert(record)
    }

    fn find_and_delete(&self, query: &LeaseQuery) -> Result<Option<LeaseRecord>, StoreError> {
        self.check()?;
        self.inner.find_and_delete(query)
    }

    fn find_and_update(
        &self,
        query: &LeaseQuery,
        update: &LeaseUpdate,
    ) -> Result<Option<LeaseRecord>, StoreError> {
        self.check()?;
        self.inner.find_and_update(query, update)
    }

    fn find_one(&self, query: &LeaseQuery) -> Result<Option<LeaseRecord>, StoreError> {
        self.check()?;
        self.inner.find_one(query)
    }

    fn write_concern(&self) -> WriteConcern {
        self.inner.write_concern()
    }

    fn with_write_concern(&self, concern: WriteConcern) -> Self {
        Self {
            inner: self.inner.with_write_concern(concern),
            health: Arc::clone(&self.health),
        }
    }
}

/// One store and one hand-driven clock shared by every mutex of a test.
pub struct Fixture {
    pub store: FaultyStore,
    pub clock: Arc<ManualClock>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            store: FaultyStore::new(),
            clock: Arc::new(ManualClock::new(t0())),
        }
    }

    pub fn mutex(&self) -> LeaseMutex<FaultyStore> {
        self.builder().build(self.store.clone())
    }

    pub fn builder(&self) -> MutexBuilder {
        MutexBuilder::new(KEY).with_clock(self.clock.clone())
    }
}

/// Callback that runs `f` on every `n`th invocation.
pub fn every_nth(n: usize, mut f: impl FnMut()) -> impl FnMut() {
    let mut calls = 0;
    move || {
        calls += 1;
        if calls % n == 0 {
            f();
        }
    }
}
