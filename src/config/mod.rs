//! Configuration models for lease mutexes and their retry loops.

pub mod mutex;

pub use mutex::{MutexConfig, RetryConfig};
