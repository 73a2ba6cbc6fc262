//! Mutex and retry configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::retry::RetryOptions;

/// Environment variable overriding [`MutexConfig::ttl_secs`].
pub const ENV_TTL_SECS: &str = "LEASE_MUTEX_TTL_SECS";
/// Environment variable overriding [`MutexConfig::max_drift_secs`].
pub const ENV_MAX_DRIFT_SECS: &str = "LEASE_MUTEX_MAX_DRIFT_SECS";
/// Environment variable overriding [`MutexConfig::tag`].
pub const ENV_TAG: &str = "LEASE_MUTEX_TAG";
/// Environment variable overriding [`RetryConfig::sleep_ms`].
pub const ENV_SLEEP_MS: &str = "LEASE_MUTEX_SLEEP_MS";
/// Environment variable overriding [`RetryConfig::timeout_ms`].
pub const ENV_TIMEOUT_MS: &str = "LEASE_MUTEX_TIMEOUT_MS";

/// Defaults for blocking operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Pause between failed attempts, in milliseconds. Zero retries
    /// immediately.
    pub sleep_ms: u64,
    /// Give up after this many milliseconds; absent means never.
    pub timeout_ms: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            sleep_ms: 100,
            timeout_ms: None,
        }
    }
}

impl RetryConfig {
    /// Validate retry values.
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_ms == Some(0) {
            return Err("timeout_ms must be greater than 0 when set".into());
        }
        Ok(())
    }
}

/// Construction-time settings for a lease mutex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutexConfig {
    /// Lease lifetime in seconds.
    pub ttl_secs: u64,
    /// Assumed bound on clock skew between participants, in seconds.
    pub max_drift_secs: u64,
    /// Fixed owner-tag prefix; random when absent.
    pub tag: Option<String>,
    /// Defaults for blocking operations.
    pub retry: RetryConfig,
}

impl Default for MutexConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 30,
            max_drift_secs: 30,
            tag: None,
            retry: RetryConfig::default(),
        }
    }
}

impl MutexConfig {
    /// Lease lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Clock drift tolerance.
    #[must_use]
    pub const fn max_drift(&self) -> Duration {
        Duration::from_secs(self.max_drift_secs)
    }

    /// Retry options for blocking calls, built from [`MutexConfig::retry`].
    ///
    /// ```
    /// use lease_mutex::{InMemoryLeaseStore, MutexBuilder, MutexConfig};
    ///
    /// let cfg = MutexConfig::from_json_str(r#"{ "retry": { "timeout_ms": 500 } }"#).unwrap();
    /// let mutex = MutexBuilder::from_config("/jobs/nightly", &cfg)
    ///     .unwrap()
    ///     .build(InMemoryLeaseStore::new());
    /// assert_eq!(mutex.synchronize(cfg.retry_options(), || 7).unwrap(), 7);
    /// ```
    #[must_use]
    pub fn retry_options(&self) -> RetryOptions<'static> {
        RetryOptions::from(&self.retry)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.ttl_secs == 0 {
            return Err("ttl_secs must be greater than 0".into());
        }
        if let Some(tag) = &self.tag {
            if tag.is_empty() {
                return Err("tag must not be empty".into());
            }
            if tag.chars().any(char::is_whitespace) {
                return Err(format!("tag `{tag}` must not contain whitespace"));
            }
        }
        self.retry.validate().map_err(|e| format!("retry invalid: {e}"))
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read overrides from the process environment, after loading a `.env`
    /// file if one is present, and validate.
    pub fn from_env() -> Result<Self, String> {
        // A missing .env file is normal.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Apply overrides produced by `lookup` on top of the defaults, and
    /// validate.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut cfg = Self::default();
        if let Some(v) = lookup(ENV_TTL_SECS) {
            cfg.ttl_secs = parse_u64(ENV_TTL_SECS, &v)?;
        }
        if let Some(v) = lookup(ENV_MAX_DRIFT_SECS) {
            cfg.max_drift_secs = parse_u64(ENV_MAX_DRIFT_SECS, &v)?;
        }
        if let Some(v) = lookup(ENV_TAG) {
            cfg.tag = Some(v);
        }
        if let Some(v) = lookup(ENV_SLEEP_MS) {
            cfg.retry.sleep_ms = parse_u64(ENV_SLEEP_MS, &v)?;
        }
        if let Some(v) = lookup(ENV_TIMEOUT_MS) {
            cfg.retry.timeout_ms = Some(parse_u64(ENV_TIMEOUT_MS, &v)?);
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_u64(name: &str, value: &str) -> Result<u64, String> {
    value
        .trim()
        .parse()
        .map_err(|e| format!("{name}=`{value}` is not a valid integer: {e}"))
}
