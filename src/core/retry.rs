//! Bounded polling loop around a single-attempt operation.

use std::fmt;
use std::thread;
use std::time::Duration;

use tracing::trace;

use crate::config::RetryConfig;
use crate::util::clock::TimeSource;

/// Default pause between failed attempts.
pub const DEFAULT_SLEEP: Duration = Duration::from_millis(100);

/// What to do between two failed attempts.
pub enum Sleep<'a> {
    /// Block the calling thread for a fixed duration.
    Fixed(Duration),
    /// Run a callback instead of sleeping, e.g. to advance a test clock or
    /// release a competing lease.
    Custom(Box<dyn FnMut() + 'a>),
}

impl<'a> Sleep<'a> {
    /// Sleep for `d` between attempts.
    #[must_use]
    pub const fn fixed(d: Duration) -> Self {
        Self::Fixed(d)
    }

    /// Run `f` between attempts.
    pub fn custom(f: impl FnMut() + 'a) -> Self {
        Self::Custom(Box::new(f))
    }

    fn pause(&mut self) {
        match self {
            Self::Fixed(d) => thread::sleep(*d),
            Self::Custom(f) => f(),
        }
    }
}

impl Default for Sleep<'_> {
    fn default() -> Self {
        Self::Fixed(DEFAULT_SLEEP)
    }
}

impl fmt::Debug for Sleep<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(d) => f.debug_tuple("Fixed").field(d).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Per-call options for blocking lease operations.
#[derive(Debug, Default)]
pub struct RetryOptions<'a> {
    /// Pause strategy between failed attempts.
    pub sleep: Sleep<'a>,
    /// Give up once this much time has passed; `None` retries forever.
    pub timeout: Option<Duration>,
}

impl<'a> RetryOptions<'a> {
    /// Default options: 100ms fixed sleep, no timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pause strategy.
    #[must_use]
    pub fn with_sleep(mut self, sleep: Sleep<'a>) -> Self {
        self.sleep = sleep;
        self
    }

    /// Set a timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl From<&RetryConfig> for RetryOptions<'static> {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            sleep: Sleep::Fixed(Duration::from_millis(cfg.sleep_ms)),
            timeout: cfg.timeout_ms.map(Duration::from_millis),
        }
    }
}

/// Invoke `attempt` until it reports success or the deadline passes.
///
/// The deadline is fixed at entry as `now + timeout`. After every failed
/// attempt the clock is read again and the loop gives up only once the
/// deadline is strictly in the past. An `Err` from `attempt` ends the loop
/// immediately and is returned as-is.
///
/// # Errors
///
/// Propagates the first error returned by `attempt`.
pub fn until_success<E>(
    clock: &dyn TimeSource,
    options: RetryOptions<'_>,
    mut attempt: impl FnMut() -> Result<bool, E>,
) -> Result<bool, E> {
    let RetryOptions { mut sleep, timeout } = options;
    let deadline = timeout.map(|t| clock.now() + t);
    let mut attempts: u64 = 0;

    loop {
        attempts += 1;
        if attempt()? {
            trace!(attempts, "attempt succeeded");
            return Ok(true);
        }
        let now = clock.now();
        if deadline.is_some_and(|d| d < now) {
            trace!(attempts, %now, "retry deadline exceeded");
            return Ok(false);
        }
        trace!(attempts, "attempt failed, pausing");
        sleep.pause();
    }
}
