//! # Lease Mutex
//!
//! A distributed mutual-exclusion lock whose state of record lives in a
//! shared document store.
//!
//! Participants (threads, processes, machines) coordinate exclusive access to
//! a named resource by racing to insert a lease record keyed by that name.
//! The store's key uniqueness decides the race; the record's expiry bounds
//! how long a crashed or partitioned holder can keep everyone else out.
//!
//! ## Key Features
//!
//! - **Lease lifecycle**: acquire, refresh, release and reload, each a single
//!   atomic store operation
//! - **Drift tolerance**: a foreign lease is only cleaned up once it is older
//!   than its TTL plus the configured maximum clock drift
//! - **Per-thread ownership**: one mutex object can be shared freely; every
//!   thread holds its own lease
//! - **Blocking forms**: bounded or unbounded retry with fixed or custom
//!   pauses, driven by a pluggable clock
//! - **Scoped sections**: [`LeaseMutex::synchronize`] releases on every exit
//!   path
//! - **Pluggable storage**: in-memory and file-backed stores ship with the
//!   crate; anything offering the four atomic operations of [`LeaseStore`]
//!   works
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use lease_mutex::{InMemoryLeaseStore, LeaseMutex, RetryOptions};
//!
//! let store = InMemoryLeaseStore::new();
//! let mutex = LeaseMutex::new(store, "/users/6/settings");
//!
//! let options = RetryOptions::new().with_timeout(Duration::from_secs(5));
//! let answer = mutex.synchronize(options, || 6 * 7)?;
//! assert_eq!(answer, 42);
//! # Ok::<(), lease_mutex::LockError>(())
//! ```
//!
//! For complete examples, see:
//! - `tests/mutex_test.rs` - Lease lifecycle against a hand-driven clock
//! - `tests/concurrency_test.rs` - Mutual exclusion across threads

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Lease lock domain: mutex, store contract, retry loop and errors.
pub mod core;
/// Configuration models for mutexes and retry loops.
pub mod config;
/// Builders to construct mutexes from configuration.
pub mod builders;
/// Infrastructure adapters for lease storage backends.
pub mod infra;
/// Shared utilities.
pub mod util;

pub use crate::builders::MutexBuilder;
pub use crate::config::{MutexConfig, RetryConfig};
pub use crate::core::{
    LeaseMutex, LeaseRecord, LeaseStore, LockError, LockOperation, LockResult, RetryOptions, Sleep,
    StoreError, WriteConcern,
};
pub use crate::infra::{FileLeaseStore, InMemoryLeaseStore};
pub use crate::util::clock::{ManualClock, SystemClock, TimeSource, Timestamp};
