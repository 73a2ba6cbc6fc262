//! Tests for error types

use std::io;

use lease_mutex::{LockError, LockOperation, StoreError};

#[test]
fn test_operation_failure_names() {
    let names: Vec<String> = LockOperation::ALL
        .iter()
        .map(|op| LockError::OperationFailure(*op).to_string())
        .collect();
    assert_eq!(
        names,
        [
            "AcquireLockFailure",
            "RefreshLockFailure",
            "ReleaseLockFailure",
            "ReloadFailure"
        ]
    );
}

#[test]
fn test_operation_display() {
    assert_eq!(LockOperation::AcquireLock.to_string(), "acquire_lock");
    assert_eq!(LockOperation::Reload.to_string(), "reload");
}

#[test]
fn test_state_misuse_errors() {
    assert_eq!(
        LockError::AlreadyAcquired.to_string(),
        "lease is already acquired by this context"
    );
    assert_eq!(
        LockError::NotYetAcquired.to_string(),
        "lease is not yet acquired by this context"
    );
    assert!(LockError::AlreadyAcquired.is_state_misuse());
    assert!(LockError::NotYetAcquired.is_state_misuse());
    assert!(!LockError::OperationFailure(LockOperation::Reload).is_state_misuse());
}

#[test]
fn test_failed_operation() {
    let err = LockError::OperationFailure(LockOperation::ReleaseLock);
    assert_eq!(err.failed_operation(), Some(LockOperation::ReleaseLock));
    assert_eq!(LockError::AlreadyAcquired.failed_operation(), None);
}

#[test]
fn test_store_error_display() {
    assert_eq!(
        StoreError::DuplicateKey("/a".into()).to_string(),
        "duplicate key: /a"
    );
    assert_eq!(
        StoreError::Connection("refused".into()).to_string(),
        "connection failure: refused"
    );
    assert_eq!(
        StoreError::Operation("not primary".into()).to_string(),
        "operation failure: not primary"
    );
}

#[test]
fn test_store_error_transience() {
    assert!(StoreError::DuplicateKey("/a".into()).is_transient());
    assert!(StoreError::Connection("refused".into()).is_transient());
    assert!(StoreError::Operation("busy".into()).is_transient());

    let io_err = StoreError::from(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
    assert!(!io_err.is_transient());
    let json_err = StoreError::from(serde_json::from_str::<u8>("x").unwrap_err());
    assert!(!json_err.is_transient());
}

#[test]
fn test_store_error_wraps_into_lock_error() {
    let err: LockError = StoreError::Io(io::Error::other("disk gone")).into();
    assert!(matches!(err, LockError::Store(StoreError::Io(_))));
    assert_eq!(err.to_string(), "store error: io error: disk gone");
}
