//! Error types for lease operations.

use std::fmt;
use std::io::ErrorKind;

use thiserror::Error;

/// The four single-attempt lease operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockOperation {
    /// Create the lease record, cleaning up an abandoned one first.
    AcquireLock,
    /// Push the expiry of a self-owned, unexpired lease forward.
    RefreshLock,
    /// Delete the self-owned lease record.
    ReleaseLock,
    /// Resynchronize the cached expiry from the store.
    Reload,
}

impl LockOperation {
    /// Every operation, in lifecycle order.
    pub const ALL: [Self; 4] = [
        Self::AcquireLock,
        Self::RefreshLock,
        Self::ReleaseLock,
        Self::Reload,
    ];

    /// Snake-case name, as used in log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AcquireLock => "acquire_lock",
            Self::RefreshLock => "refresh_lock",
            Self::ReleaseLock => "release_lock",
            Self::Reload => "reload",
        }
    }

    /// Name of the failure raised when this operation resolves to false.
    #[must_use]
    pub const fn failure_name(self) -> &'static str {
        match self {
            Self::AcquireLock => "AcquireLockFailure",
            Self::RefreshLock => "RefreshLockFailure",
            Self::ReleaseLock => "ReleaseLockFailure",
            Self::Reload => "ReloadFailure",
        }
    }
}

impl fmt::Display for LockOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported by a [`LeaseStore`](crate::core::LeaseStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with the same key already exists.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),
    /// The store could not be reached.
    #[error("connection failure: {0}")]
    Connection(String),
    /// The store rejected or failed the operation.
    #[error("operation failure: {0}")]
    Operation(String),
    /// Local I/O failed underneath the store.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Stored data could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether the failure is contention or a connectivity blip that a
    /// caller may simply retry. Interrupted, timed-out and would-block I/O
    /// count as blips.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::DuplicateKey(_) | Self::Connection(_) | Self::Operation(_) => true,
            Self::Io(e) => matches!(
                e.kind(),
                ErrorKind::Interrupted | ErrorKind::TimedOut | ErrorKind::WouldBlock
            ),
            Self::Serialization(_) => false,
        }
    }
}

/// Errors produced by lease mutex operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Acquire was attempted while this context already holds the lease.
    #[error("lease is already acquired by this context")]
    AlreadyAcquired,
    /// Refresh was attempted before this context acquired the lease.
    #[error("lease is not yet acquired by this context")]
    NotYetAcquired,
    /// A strict operation resolved to false after any retries.
    #[error("{}", .0.failure_name())]
    OperationFailure(LockOperation),
    /// The store failed in a way that retrying will not fix.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl LockError {
    /// The operation that failed, for [`LockError::OperationFailure`].
    #[must_use]
    pub const fn failed_operation(&self) -> Option<LockOperation> {
        match self {
            Self::OperationFailure(op) => Some(*op),
            _ => None,
        }
    }

    /// Whether this error signals misuse of the lock by the caller.
    #[must_use]
    pub const fn is_state_misuse(&self) -> bool {
        matches!(self, Self::AlreadyAcquired | Self::NotYetAcquired)
    }
}

/// Result alias for lease mutex operations.
pub type LockResult<T> = Result<T, LockError>;
