//! Calling-context identity.
//!
//! Lease ownership is per thread: the same mutex object used from two
//! threads holds two independent leases. [`ThreadId`](std::thread::ThreadId)
//! has no stable integer form, so each thread is handed a number from a
//! process-wide counter the first time it asks.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CONTEXT_ID: u64 = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
}

/// Identifier of the calling thread, unique within this process and never
/// reused.
#[must_use]
pub fn current_context_id() -> u64 {
    CONTEXT_ID.with(|id| *id)
}

/// Identifier of the current OS process.
#[must_use]
pub fn current_process_id() -> u32 {
    std::process::id()
}
