//! Tests for configuration validation

use std::collections::HashMap;
use std::time::Duration;

use lease_mutex::config::mutex::{
    ENV_MAX_DRIFT_SECS, ENV_SLEEP_MS, ENV_TAG, ENV_TIMEOUT_MS, ENV_TTL_SECS,
};
use lease_mutex::{MutexConfig, RetryConfig, RetryOptions, Sleep};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

#[test]
fn test_default_config_is_valid() {
    let cfg = MutexConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.ttl(), Duration::from_secs(30));
    assert_eq!(cfg.max_drift(), Duration::from_secs(30));
    assert_eq!(cfg.tag, None);
    assert_eq!(cfg.retry, RetryConfig { sleep_ms: 100, timeout_ms: None });
}

#[test]
fn test_config_invalid_ttl() {
    let cfg = MutexConfig {
        ttl_secs: 0,
        ..MutexConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_zero_drift_is_allowed() {
    let cfg = MutexConfig {
        max_drift_secs: 0,
        ..MutexConfig::default()
    };
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_config_invalid_tag() {
    let empty = MutexConfig {
        tag: Some(String::new()),
        ..MutexConfig::default()
    };
    assert!(empty.validate().is_err());

    let spaced = MutexConfig {
        tag: Some("two words".into()),
        ..MutexConfig::default()
    };
    let err = spaced.validate().unwrap_err();
    assert!(err.contains("two words"));
}

#[test]
fn test_retry_config_validation() {
    assert!(RetryConfig { sleep_ms: 0, timeout_ms: None }.validate().is_ok());
    assert!(RetryConfig { sleep_ms: 10, timeout_ms: Some(0) }.validate().is_err());
    assert!(RetryConfig { sleep_ms: 10, timeout_ms: Some(1) }.validate().is_ok());

    let cfg = MutexConfig {
        retry: RetryConfig { sleep_ms: 10, timeout_ms: Some(0) },
        ..MutexConfig::default()
    };
    assert!(cfg.validate().unwrap_err().starts_with("retry invalid"));
}

#[test]
fn test_config_from_json_fills_defaults() {
    let cfg = MutexConfig::from_json_str(r#"{ "ttl_secs": 5, "retry": { "timeout_ms": 2000 } }"#)
        .unwrap();
    assert_eq!(cfg.ttl_secs, 5);
    assert_eq!(cfg.max_drift_secs, 30);
    assert_eq!(cfg.retry.sleep_ms, 100);
    assert_eq!(cfg.retry.timeout_ms, Some(2000));
}

#[test]
fn test_config_from_json_rejects_bad_input() {
    assert!(MutexConfig::from_json_str("{ not json").unwrap_err().starts_with("parse error"));
    assert!(MutexConfig::from_json_str(r#"{ "ttl_secs": 0 }"#).is_err());
}

#[test]
fn test_config_serialization_roundtrip() {
    let cfg = MutexConfig {
        ttl_secs: 7,
        max_drift_secs: 2,
        tag: Some("worker".into()),
        retry: RetryConfig { sleep_ms: 25, timeout_ms: Some(500) },
    };
    let json = serde_json::to_string(&cfg).unwrap();
    assert_eq!(MutexConfig::from_json_str(&json).unwrap(), cfg);
}

#[test]
fn test_config_from_lookup_overrides() {
    let cfg = MutexConfig::from_lookup(lookup(&[
        (ENV_TTL_SECS, "12"),
        (ENV_MAX_DRIFT_SECS, " 4 "),
        (ENV_TAG, "billing"),
        (ENV_SLEEP_MS, "50"),
        (ENV_TIMEOUT_MS, "3000"),
    ]))
    .unwrap();

    assert_eq!(cfg.ttl_secs, 12);
    assert_eq!(cfg.max_drift_secs, 4);
    assert_eq!(cfg.tag.as_deref(), Some("billing"));
    assert_eq!(cfg.retry, RetryConfig { sleep_ms: 50, timeout_ms: Some(3000) });
}

#[test]
fn test_config_from_lookup_without_overrides() {
    let cfg = MutexConfig::from_lookup(|_| None).unwrap();
    assert_eq!(cfg, MutexConfig::default());
}

#[test]
fn test_config_from_lookup_rejects_garbage() {
    let err = MutexConfig::from_lookup(lookup(&[(ENV_TTL_SECS, "soon")])).unwrap_err();
    assert!(err.contains(ENV_TTL_SECS));

    assert!(MutexConfig::from_lookup(lookup(&[(ENV_TTL_SECS, "0")])).is_err());
    assert!(MutexConfig::from_lookup(lookup(&[(ENV_TAG, "a b")])).is_err());
}

#[test]
fn test_retry_options_from_config() {
    let options = RetryOptions::from(&RetryConfig { sleep_ms: 25, timeout_ms: Some(500) });
    assert!(matches!(options.sleep, Sleep::Fixed(d) if d == Duration::from_millis(25)));
    assert_eq!(options.timeout, Some(Duration::from_millis(500)));

    let unbounded = RetryOptions::from(&RetryConfig::default());
    assert_eq!(unbounded.timeout, None);
}

#[test]
fn test_zero_sleep_config_retries_immediately() {
    let cfg = MutexConfig::from_lookup(lookup(&[(ENV_SLEEP_MS, "0")])).unwrap();
    assert!(matches!(cfg.retry_options().sleep, Sleep::Fixed(d) if d == Duration::ZERO));
}

#[test]
fn test_config_exposes_retry_options() {
    let cfg = MutexConfig::from_json_str(r#"{ "retry": { "sleep_ms": 5, "timeout_ms": 40 } }"#)
        .unwrap();
    let options = cfg.retry_options();
    assert!(matches!(options.sleep, Sleep::Fixed(d) if d == Duration::from_millis(5)));
    assert_eq!(options.timeout, Some(Duration::from_millis(40)));
}
