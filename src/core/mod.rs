//! Lease lock domain: the mutex, its store contract, retry loop and errors.

pub mod error;
pub mod mutex;
pub mod retry;
pub mod store;
pub mod tag;

pub use error::{LockError, LockOperation, LockResult, StoreError};
pub use mutex::{LeaseMutex, DEFAULT_MAX_DRIFT, DEFAULT_TTL};
pub use retry::{until_success, RetryOptions, Sleep, DEFAULT_SLEEP};
pub use store::{ExpiryPredicate, LeaseQuery, LeaseRecord, LeaseStore, LeaseUpdate, WriteConcern};
pub use tag::{current_owner_tag, next_tag_prefix, owner_tag};
