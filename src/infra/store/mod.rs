//! Lease store backends.

pub mod file;
pub mod memory;

pub use file::FileLeaseStore;
pub use memory::InMemoryLeaseStore;
