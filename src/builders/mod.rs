//! Builders to construct lease mutexes from configuration.

pub mod mutex_builder;

pub use mutex_builder::MutexBuilder;
