//! Infrastructure adapters for lease storage backends.

pub mod store;

pub use store::{FileLeaseStore, InMemoryLeaseStore};
