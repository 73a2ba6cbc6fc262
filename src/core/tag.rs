//! Owner tags and the per-context lease cache.

use std::collections::HashMap;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::util::clock::Timestamp;
use crate::util::context::{current_context_id, current_process_id};

const TAG_SEPARATOR: char = '-';

/// Fresh random tag prefix: 32 lowercase hex digits.
#[must_use]
pub fn next_tag_prefix() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Compose an owner tag from its parts.
#[must_use]
pub fn owner_tag(prefix: &str, process_id: u32, context_id: u64) -> String {
    format!("{prefix}{TAG_SEPARATOR}{process_id}{TAG_SEPARATOR}{context_id}")
}

/// Owner tag of the calling thread for a given prefix.
#[must_use]
pub fn current_owner_tag(prefix: &str) -> String {
    owner_tag(prefix, current_process_id(), current_context_id())
}

/// Last known expiry of one context's own lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CachedLease {
    pub(crate) expires_at: Timestamp,
}

/// Client-side lease state, namespaced by calling context.
///
/// The map lock is only held to read or write an entry, never across a store
/// round trip. Expired entries are dropped whenever they are seen, so a
/// thread that exits while holding a lease does not pin its entry.
#[derive(Debug, Default)]
pub(crate) struct LeaseCache {
    entries: Mutex<HashMap<u64, CachedLease>>,
}

impl LeaseCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Cached expiry of the calling context, stale or not.
    #[cfg(test)]
    pub(crate) fn expires_at(&self) -> Option<Timestamp> {
        self.entries
            .lock()
            .get(&current_context_id())
            .map(|c| c.expires_at)
    }

    /// Cached expiry of the calling context if it is still after `now`.
    pub(crate) fn active_at(&self, now: Timestamp) -> Option<Timestamp> {
        let ctx = current_context_id();
        let mut entries = self.entries.lock();
        let cached = entries.get(&ctx).map(|c| c.expires_at)?;
        if cached > now {
            Some(cached)
        } else {
            entries.remove(&ctx);
            None
        }
    }

    /// Record or clear the calling context's expiry, dropping every entry
    /// that has lapsed by `now`.
    pub(crate) fn store(&self, expires_at: Option<Timestamp>, now: Timestamp) {
        let ctx = current_context_id();
        let mut entries = self.entries.lock();
        entries.retain(|_, c| c.expires_at > now);
        match expires_at {
            Some(expires_at) => {
                entries.insert(ctx, CachedLease { expires_at });
            }
            None => {
                entries.remove(&ctx);
            }
        }
    }

    /// Number of contexts with a cached entry.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
