//! Tests for builders

use std::sync::Arc;
use std::time::Duration;

use lease_mutex::{
    InMemoryLeaseStore, ManualClock, MutexBuilder, MutexConfig, Timestamp,
};

#[test]
fn test_builder_defaults() {
    let mutex = MutexBuilder::new("/reports/daily").build(InMemoryLeaseStore::new());
    assert_eq!(mutex.key(), "/reports/daily");
    assert_eq!(mutex.ttl(), Duration::from_secs(30));
    assert_eq!(mutex.max_drift(), Duration::from_secs(30));
    assert_eq!(mutex.tag_prefix().len(), 32);
}

#[test]
fn test_builder_random_prefixes_differ() {
    let a = MutexBuilder::new("/k").build(InMemoryLeaseStore::new());
    let b = MutexBuilder::new("/k").build(InMemoryLeaseStore::new());
    assert_ne!(a.tag_prefix(), b.tag_prefix());
}

#[test]
fn test_builder_tag_layout() {
    let mutex = MutexBuilder::new("/k")
        .with_tag("svc")
        .build(InMemoryLeaseStore::new());
    let tag = mutex.tag();
    let parts: Vec<&str> = tag.split('-').collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], "svc");
    assert_eq!(parts[1], std::process::id().to_string());
    assert!(parts[2].parse::<u64>().is_ok());
}

#[test]
fn test_builder_clock_drives_expiry() {
    let clock = Arc::new(ManualClock::new(Timestamp::from_secs(1_000)));
    let mutex = MutexBuilder::new("/k")
        .with_ttl(Duration::from_secs(8))
        .with_clock(clock.clone())
        .build(InMemoryLeaseStore::new());

    assert!(mutex.try_acquire_lock().unwrap());
    assert_eq!(mutex.expires_at(), Some(Timestamp::from_secs(1_008)));

    clock.advance(Duration::from_secs(8));
    assert!(!mutex.is_acquired());
}

#[test]
fn test_builder_from_config_without_tag_is_random() {
    let builder = MutexBuilder::from_config("/k", &MutexConfig::default()).unwrap();
    let mutex = builder.build(InMemoryLeaseStore::new());
    assert_eq!(mutex.tag_prefix().len(), 32);
}

#[test]
fn test_builder_from_config_rejects_invalid() {
    let cfg = MutexConfig {
        tag: Some("has space".into()),
        ..MutexConfig::default()
    };
    assert!(MutexBuilder::from_config("/k", &cfg).is_err());
}
