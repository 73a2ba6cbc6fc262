//! Lease-based distributed mutex.
//!
//! A [`LeaseMutex`] guards a named resource by owning a single lease record
//! in a shared [`LeaseStore`]. Whoever manages to insert the record under the
//! resource key holds the lock until the record's `expires_at` passes, so a
//! crashed holder blocks others for at most one TTL (plus the drift margin).
//!
//! Ownership is tracked per calling thread. One `LeaseMutex` shared between
//! threads behaves like one mutex per thread pointed at the same key: each
//! thread derives its own owner tag and keeps its own cached expiry.
//!
//! # Operation forms
//!
//! Each [`LockOperation`] is available in four forms:
//!
//! | form                      | retries | on `false`                          |
//! |---------------------------|---------|-------------------------------------|
//! | `try_<op>`                | no      | `Ok(false)`                         |
//! | `try_<op>_or_fail`        | no      | `Err(LockError::OperationFailure)`  |
//! | `<op>(options)`           | yes     | `Ok(false)` once timed out          |
//! | `<op>_or_fail(options)`   | yes     | `Err(LockError::OperationFailure)`  |
//!
//! Transient store failures (contention, connectivity) count as `false`.
//!
//! # Examples
//!
//! ```
//! use lease_mutex::{InMemoryLeaseStore, LeaseMutex, RetryOptions};
//!
//! let store = InMemoryLeaseStore::new();
//! let mutex = LeaseMutex::new(store.clone(), "/users/6/settings");
//! let other = LeaseMutex::new(store, "/users/6/settings");
//!
//! assert!(mutex.try_acquire_lock().unwrap());
//! assert!(!other.try_acquire_lock().unwrap());
//!
//! assert!(mutex.try_release_lock().unwrap());
//! let value = other.synchronize(RetryOptions::new(), || 42).unwrap();
//! assert_eq!(value, 42);
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::builders::MutexBuilder;
use crate::core::error::{LockError, LockOperation, LockResult, StoreError};
use crate::core::retry::{self, RetryOptions};
use crate::core::store::{ExpiryPredicate, LeaseQuery, LeaseRecord, LeaseStore, LeaseUpdate, WriteConcern};
use crate::core::tag::{current_owner_tag, LeaseCache};
use crate::util::clock::{TimeSource, Timestamp};

/// Default lease lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);
/// Default bound on clock disagreement between participants.
pub const DEFAULT_MAX_DRIFT: Duration = Duration::from_secs(30);

/// Distributed mutex over one key of a [`LeaseStore`].
pub struct LeaseMutex<S> {
    store: S,
    key: String,
    tag_prefix: String,
    clock: Arc<dyn TimeSource>,
    ttl: Duration,
    max_drift: Duration,
    cache: LeaseCache,
}

impl<S: LeaseStore> LeaseMutex<S> {
    /// Create a mutex with a random tag prefix, the system clock and default
    /// TTL and drift. Use [`MutexBuilder`] for anything else.
    pub fn new(store: S, key: impl Into<String>) -> Self {
        MutexBuilder::new(key).build(store)
    }

    pub(crate) fn from_parts(
        store: S,
        key: String,
        tag_prefix: String,
        clock: Arc<dyn TimeSource>,
        ttl: Duration,
        max_drift: Duration,
    ) -> Self {
        let store = if store.write_concern() < WriteConcern::Acknowledged {
            debug!(%key, "upgrading store handle to acknowledged writes");
            store.with_write_concern(WriteConcern::Acknowledged)
        } else {
            store
        };
        Self {
            store,
            key,
            tag_prefix,
            clock,
            ttl,
            max_drift,
            cache: LeaseCache::new(),
        }
    }

    /// Resource key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Random or configured prefix shared by every tag of this instance.
    pub fn tag_prefix(&self) -> &str {
        &self.tag_prefix
    }

    /// Owner tag of the calling thread.
    pub fn tag(&self) -> String {
        current_owner_tag(&self.tag_prefix)
    }

    /// Lifetime granted by each acquire or refresh.
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Clock skew tolerated before a foreign lease is treated as abandoned.
    pub const fn max_drift(&self) -> Duration {
        self.max_drift
    }

    /// Backing store handle.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Whether the calling thread believes it holds an unexpired lease.
    ///
    /// Answered from local state only; see [`LeaseMutex::try_reload`] to
    /// resynchronize with the store.
    pub fn is_acquired(&self) -> bool {
        self.expires_at().is_some()
    }

    /// Cached expiry of the calling thread's lease, if still in the future.
    pub fn expires_at(&self) -> Option<Timestamp> {
        self.cache.active_at(self.tick())
    }

    /// The calling thread's unexpired lease record as currently stored.
    ///
    /// # Errors
    ///
    /// Returns the store error if the lookup fails.
    pub fn to_record(&self) -> Result<Option<LeaseRecord>, StoreError> {
        self.store.find_one(&self.unexpired_query(self.tick()))
    }

    /// Run one attempt of `op`.
    ///
    /// # Errors
    ///
    /// State misuse ([`LockError::AlreadyAcquired`],
    /// [`LockError::NotYetAcquired`]) and non-transient store failures.
    pub fn try_operation(&self, op: LockOperation) -> LockResult<bool> {
        let now = self.tick();
        let outcome = match op {
            LockOperation::AcquireLock => self.acquire_at(now),
            LockOperation::RefreshLock => self.refresh_at(now),
            LockOperation::ReleaseLock => self.release_at(now),
            LockOperation::Reload => self.reload_at(now),
        };
        self.settle(op, outcome)
    }

    /// Run one attempt of `op`, failing if it does not succeed.
    ///
    /// # Errors
    ///
    /// As [`LeaseMutex::try_operation`], plus
    /// [`LockError::OperationFailure`] when the attempt returns false.
    pub fn try_operation_or_fail(&self, op: LockOperation) -> LockResult<()> {
        strict(op, self.try_operation(op))
    }

    /// Retry `op` until it succeeds or `options.timeout` passes.
    ///
    /// # Errors
    ///
    /// As [`LeaseMutex::try_operation`]; errors are never retried.
    pub fn operation(&self, op: LockOperation, options: RetryOptions<'_>) -> LockResult<bool> {
        retry::until_success(self.clock.as_ref(), options, || self.try_operation(op))
    }

    /// Retry `op`, failing if it never succeeds before the timeout.
    ///
    /// # Errors
    ///
    /// As [`LeaseMutex::operation`], plus [`LockError::OperationFailure`]
    /// on timeout.
    pub fn operation_or_fail(&self, op: LockOperation, options: RetryOptions<'_>) -> LockResult<()> {
        strict(op, self.operation(op, options))
    }

    /// Single attempt to take the lease.
    ///
    /// # Errors
    ///
    /// [`LockError::AlreadyAcquired`] if this thread already holds it.
    pub fn try_acquire_lock(&self) -> LockResult<bool> {
        self.try_operation(LockOperation::AcquireLock)
    }

    /// Single attempt to take the lease, failing if it is held elsewhere.
    ///
    /// # Errors
    ///
    /// [`LockError::AlreadyAcquired`] or an `AcquireLock` operation failure.
    pub fn try_acquire_lock_or_fail(&self) -> LockResult<()> {
        self.try_operation_or_fail(LockOperation::AcquireLock)
    }

    /// Keep trying to take the lease.
    ///
    /// # Errors
    ///
    /// [`LockError::AlreadyAcquired`] if this thread already holds it.
    pub fn acquire_lock(&self, options: RetryOptions<'_>) -> LockResult<bool> {
        self.operation(LockOperation::AcquireLock, options)
    }

    /// Keep trying to take the lease, failing on timeout.
    ///
    /// # Errors
    ///
    /// [`LockError::AlreadyAcquired`] or an `AcquireLock` operation failure.
    pub fn acquire_lock_or_fail(&self, options: RetryOptions<'_>) -> LockResult<()> {
        self.operation_or_fail(LockOperation::AcquireLock, options)
    }

    /// Single attempt to extend the lease.
    ///
    /// # Errors
    ///
    /// [`LockError::NotYetAcquired`] if this thread holds no cached lease.
    pub fn try_refresh_lock(&self) -> LockResult<bool> {
        self.try_operation(LockOperation::RefreshLock)
    }

    /// Single attempt to extend the lease, failing if it is gone.
    ///
    /// # Errors
    ///
    /// [`LockError::NotYetAcquired`] or a `RefreshLock` operation failure.
    pub fn try_refresh_lock_or_fail(&self) -> LockResult<()> {
        self.try_operation_or_fail(LockOperation::RefreshLock)
    }

    /// Keep trying to extend the lease.
    ///
    /// # Errors
    ///
    /// [`LockError::NotYetAcquired`] if this thread holds no cached lease.
    pub fn refresh_lock(&self, options: RetryOptions<'_>) -> LockResult<bool> {
        self.operation(LockOperation::RefreshLock, options)
    }

    /// Keep trying to extend the lease, failing on timeout.
    ///
    /// # Errors
    ///
    /// [`LockError::NotYetAcquired`] or a `RefreshLock` operation failure.
    pub fn refresh_lock_or_fail(&self, options: RetryOptions<'_>) -> LockResult<()> {
        self.operation_or_fail(LockOperation::RefreshLock, options)
    }

    /// Single attempt to drop the lease. Idempotent.
    ///
    /// # Errors
    ///
    /// Non-transient store failures only.
    pub fn try_release_lock(&self) -> LockResult<bool> {
        self.try_operation(LockOperation::ReleaseLock)
    }

    /// Single attempt to drop the lease, failing if the store is unreachable.
    ///
    /// # Errors
    ///
    /// A `ReleaseLock` operation failure.
    pub fn try_release_lock_or_fail(&self) -> LockResult<()> {
        self.try_operation_or_fail(LockOperation::ReleaseLock)
    }

    /// Keep trying to drop the lease.
    ///
    /// # Errors
    ///
    /// Non-transient store failures only.
    pub fn release_lock(&self, options: RetryOptions<'_>) -> LockResult<bool> {
        self.operation(LockOperation::ReleaseLock, options)
    }

    /// Keep trying to drop the lease, failing on timeout.
    ///
    /// # Errors
    ///
    /// A `ReleaseLock` operation failure.
    pub fn release_lock_or_fail(&self, options: RetryOptions<'_>) -> LockResult<()> {
        self.operation_or_fail(LockOperation::ReleaseLock, options)
    }

    /// Single attempt to reload the cached expiry from the store.
    ///
    /// # Errors
    ///
    /// Non-transient store failures only.
    pub fn try_reload(&self) -> LockResult<bool> {
        self.try_operation(LockOperation::Reload)
    }

    /// Single attempt to reload, failing if the store is unreachable.
    ///
    /// # Errors
    ///
    /// A `Reload` operation failure.
    pub fn try_reload_or_fail(&self) -> LockResult<()> {
        self.try_operation_or_fail(LockOperation::Reload)
    }

    /// Keep trying to reload the cached expiry.
    ///
    /// # Errors
    ///
    /// Non-transient store failures only.
    pub fn reload(&self, options: RetryOptions<'_>) -> LockResult<bool> {
        self.operation(LockOperation::Reload, options)
    }

    /// Keep trying to reload, failing on timeout.
    ///
    /// # Errors
    ///
    /// A `Reload` operation failure.
    pub fn reload_or_fail(&self, options: RetryOptions<'_>) -> LockResult<()> {
        self.operation_or_fail(LockOperation::Reload, options)
    }

    /// Acquire the lease (retrying per `options`), run `f`, then release.
    ///
    /// The release is a single best-effort attempt made on every exit path,
    /// including a panic unwinding out of `f`; its failure is logged and
    /// otherwise ignored, leaving the lease to expire on its own.
    ///
    /// # Errors
    ///
    /// Whatever [`LeaseMutex::acquire_lock_or_fail`] returns; `f` is not run
    /// in that case.
    pub fn synchronize<T>(&self, options: RetryOptions<'_>, f: impl FnOnce() -> T) -> LockResult<T> {
        self.acquire_lock_or_fail(options)?;
        let _release = ReleaseOnDrop { mutex: self };
        Ok(f())
    }

    fn tick(&self) -> Timestamp {
        self.clock.now()
    }

    fn id_query(&self) -> LeaseQuery {
        LeaseQuery::by_key(&self.key).with_tag(self.tag())
    }

    fn unexpired_query(&self, now: Timestamp) -> LeaseQuery {
        self.id_query().with_expiry(ExpiryPredicate::AtOrAfter(now))
    }

    fn abandoned_query(&self, now: Timestamp) -> LeaseQuery {
        let cutoff = now.saturating_sub(self.max_drift);
        LeaseQuery::by_key(&self.key).with_expiry(ExpiryPredicate::Before(cutoff))
    }

    fn acquire_at(&self, now: Timestamp) -> LockResult<bool> {
        if self.cache.active_at(now).is_some() {
            return Err(LockError::AlreadyAcquired);
        }

        if let Some(stale) = self.store.find_and_delete(&self.abandoned_query(now))? {
            debug!(
                key = %self.key,
                stale_tag = %stale.tag,
                stale_expires_at = %stale.expires_at,
                "removed abandoned lease"
            );
        }

        let record = LeaseRecord {
            key: self.key.clone(),
            tag: self.tag(),
            expires_at: now + self.ttl,
        };
        self.store.insert(&record)?;
        self.cache.store(Some(record.expires_at), now);
        debug!(key = %self.key, tag = %record.tag, expires_at = %record.expires_at, "lease acquired");
        Ok(true)
    }

    fn refresh_at(&self, now: Timestamp) -> LockResult<bool> {
        if self.cache.active_at(now).is_none() {
            return Err(LockError::NotYetAcquired);
        }

        let update = LeaseUpdate {
            expires_at: now + self.ttl,
        };
        if self.store.find_and_update(&self.unexpired_query(now), &update)?.is_none() {
            debug!(key = %self.key, "lease lost before refresh");
            return Ok(false);
        }
        self.cache.store(Some(update.expires_at), now);
        debug!(key = %self.key, expires_at = %update.expires_at, "lease refreshed");
        Ok(true)
    }

    fn release_at(&self, now: Timestamp) -> LockResult<bool> {
        let removed = self.store.find_and_delete(&self.id_query())?;
        self.cache.store(None, now);
        debug!(key = %self.key, existed = removed.is_some(), "lease released");
        Ok(true)
    }

    fn reload_at(&self, now: Timestamp) -> LockResult<bool> {
        let record = self.store.find_one(&self.id_query())?;
        self.cache.store(record.map(|r| r.expires_at), now);
        Ok(true)
    }

    /// Fold transient store failures into `false`.
    fn settle(&self, op: LockOperation, outcome: LockResult<bool>) -> LockResult<bool> {
        match outcome {
            Err(LockError::Store(e)) if e.is_transient() => {
                if matches!(e, StoreError::DuplicateKey(_)) {
                    debug!(key = %self.key, "lease held by another owner");
                } else {
                    warn!(key = %self.key, operation = %op, error = %e, "transient store failure");
                }
                Ok(false)
            }
            other => other,
        }
    }
}

impl<S> fmt::Debug for LeaseMutex<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeaseMutex")
            .field("key", &self.key)
            .field("tag_prefix", &self.tag_prefix)
            .field("ttl", &self.ttl)
            .field("max_drift", &self.max_drift)
            .finish_non_exhaustive()
    }
}

fn strict(op: LockOperation, outcome: LockResult<bool>) -> LockResult<()> {
    if outcome? {
        Ok(())
    } else {
        Err(LockError::OperationFailure(op))
    }
}

struct ReleaseOnDrop<'a, S: LeaseStore> {
    mutex: &'a LeaseMutex<S>,
}

impl<S: LeaseStore> Drop for ReleaseOnDrop<'_, S> {
    fn drop(&mut self) {
        match self.mutex.try_release_lock() {
            Ok(true) => {}
            Ok(false) => warn!(key = %self.mutex.key, "release after synchronized section failed"),
            Err(e) => warn!(key = %self.mutex.key, error = %e, "release after synchronized section failed"),
        }
    }
}
