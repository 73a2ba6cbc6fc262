//! Builder for [`LeaseMutex`].

use std::sync::Arc;
use std::time::Duration;

use crate::config::MutexConfig;
use crate::core::mutex::{LeaseMutex, DEFAULT_MAX_DRIFT, DEFAULT_TTL};
use crate::core::store::LeaseStore;
use crate::core::tag::next_tag_prefix;
use crate::util::clock::{SystemClock, TimeSource};

/// Collects construction-time settings for a [`LeaseMutex`].
///
/// ```
/// use std::time::Duration;
/// use lease_mutex::{InMemoryLeaseStore, MutexBuilder};
///
/// let mutex = MutexBuilder::new("/jobs/nightly")
///     .with_ttl(Duration::from_secs(10))
///     .with_tag("reporter")
///     .build(InMemoryLeaseStore::new());
/// assert_eq!(mutex.ttl(), Duration::from_secs(10));
/// assert!(mutex.tag().starts_with("reporter-"));
/// ```
pub struct MutexBuilder {
    key: String,
    tag_prefix: Option<String>,
    clock: Option<Arc<dyn TimeSource>>,
    ttl: Duration,
    max_drift: Duration,
}

impl MutexBuilder {
    /// Start from defaults for `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            tag_prefix: None,
            clock: None,
            ttl: DEFAULT_TTL,
            max_drift: DEFAULT_MAX_DRIFT,
        }
    }

    /// Start from a validated configuration.
    ///
    /// Only the lease settings are carried over. Retry settings apply per
    /// call; pass [`MutexConfig::retry_options`] to the blocking forms.
    ///
    /// # Errors
    ///
    /// Returns the validation message if `cfg` is invalid.
    pub fn from_config(key: impl Into<String>, cfg: &MutexConfig) -> Result<Self, String> {
        cfg.validate()?;
        let mut builder = Self::new(key)
            .with_ttl(cfg.ttl())
            .with_max_drift(cfg.max_drift());
        builder.tag_prefix.clone_from(&cfg.tag);
        Ok(builder)
    }

    /// Resource key the mutex will guard.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Lease lifetime.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Clock drift tolerance.
    #[must_use]
    pub const fn with_max_drift(mut self, max_drift: Duration) -> Self {
        self.max_drift = max_drift;
        self
    }

    /// Fixed tag prefix. Mutexes sharing a prefix share owner tags on the
    /// same thread.
    #[must_use]
    pub fn with_tag(mut self, prefix: impl Into<String>) -> Self {
        self.tag_prefix = Some(prefix.into());
        self
    }

    /// Clock to use instead of the wall clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Bind to `store` and build the mutex.
    pub fn build<S: LeaseStore>(self, store: S) -> LeaseMutex<S> {
        LeaseMutex::from_parts(
            store,
            self.key,
            self.tag_prefix.unwrap_or_else(next_tag_prefix),
            self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            self.ttl,
            self.max_drift,
        )
    }
}
