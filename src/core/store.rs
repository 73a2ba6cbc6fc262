//! Lease document model and the storage contract the mutex relies on.
//!
//! A backend only has to offer four atomic single-document operations plus a
//! uniqueness constraint on the key. Every query the mutex issues is one of
//! three shapes:
//!
//! | purpose                | predicate                              |
//! |------------------------|----------------------------------------|
//! | own record             | `_id == key && tag == tag`             |
//! | own unexpired record   | `... && expires_at >= now`             |
//! | abandoned record       | `_id == key && expires_at < cutoff`    |

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::StoreError;
use crate::util::clock::Timestamp;

/// One lease, stored per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeaseRecord {
    /// Name of the guarded resource.
    #[serde(rename = "_id")]
    pub key: String,
    /// Owner tag of the holding context.
    pub tag: String,
    /// Instant after which the lease lapses.
    pub expires_at: Timestamp,
}

/// Condition on a record's expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryPredicate {
    /// `expires_at < t`.
    Before(Timestamp),
    /// `expires_at >= t`.
    AtOrAfter(Timestamp),
}

impl ExpiryPredicate {
    /// Evaluate against an expiry.
    #[must_use]
    pub fn matches(self, expires_at: Timestamp) -> bool {
        match self {
            Self::Before(t) => expires_at < t,
            Self::AtOrAfter(t) => expires_at >= t,
        }
    }
}

/// Selection of at most one lease record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseQuery {
    /// Record key; always matched exactly.
    pub key: String,
    /// Owner tag to match, if any.
    pub tag: Option<String>,
    /// Expiry condition, if any.
    pub expiry: Option<ExpiryPredicate>,
}

impl LeaseQuery {
    /// Match any record under `key`.
    pub fn by_key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            tag: None,
            expiry: None,
        }
    }

    /// Additionally require the owner tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Additionally require an expiry condition.
    #[must_use]
    pub const fn with_expiry(mut self, expiry: ExpiryPredicate) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Whether `record` satisfies every condition.
    #[must_use]
    pub fn matches(&self, record: &LeaseRecord) -> bool {
        record.key == self.key
            && self.tag.as_ref().is_none_or(|t| *t == record.tag)
            && self.expiry.is_none_or(|p| p.matches(record.expires_at))
    }
}

/// The only mutation ever applied to an existing record: `$set` of the expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseUpdate {
    /// New expiry.
    pub expires_at: Timestamp,
}

impl LeaseUpdate {
    /// Apply the update in place.
    pub const fn apply(&self, record: &mut LeaseRecord) {
        record.expires_at = self.expires_at;
    }
}

/// Write acknowledgement level of a store handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteConcern {
    /// Fire-and-forget: write errors are not reported back.
    Unacknowledged,
    /// The store confirms each write, reporting failures.
    Acknowledged,
}

/// Abstraction over a document collection holding lease records.
///
/// Each operation must be atomic with respect to the single document it
/// touches, and `insert` must enforce key uniqueness.
pub trait LeaseStore: Send + Sync {
    /// Insert a new record; fails with [`StoreError::DuplicateKey`] if the key
    /// is taken.
    fn insert(&self, record: &LeaseRecord) -> Result<(), StoreError>;

    /// Atomically remove at most one matching record, returning it.
    fn find_and_delete(&self, query: &LeaseQuery) -> Result<Option<LeaseRecord>, StoreError>;

    /// Atomically update at most one matching record, returning it as it was
    /// before the update.
    fn find_and_update(
        &self,
        query: &LeaseQuery,
        update: &LeaseUpdate,
    ) -> Result<Option<LeaseRecord>, StoreError>;

    /// Look up one matching record.
    fn find_one(&self, query: &LeaseQuery) -> Result<Option<LeaseRecord>, StoreError>;

    /// Acknowledgement level of this handle.
    fn write_concern(&self) -> WriteConcern;

    /// A handle onto the same records with a different acknowledgement level.
    #[must_use]
    fn with_write_concern(&self, concern: WriteConcern) -> Self
    where
        Self: Sized;
}

impl<S: LeaseStore> LeaseStore for Arc<S> {
    fn insert(&self, record: &LeaseRecord) -> Result<(), StoreError> {
        (**self).insert(record)
    }

    fn find_and_delete(&self, query: &LeaseQuery) -> Result<Option<LeaseRecord>, StoreError> {
        (**self).find_and_delete(query)
    }

    fn find_and_update(
        &self,
        query: &LeaseQuery,
        update: &LeaseUpdate,
    ) -> Result<Option<LeaseRecord>, StoreError> {
        (**self).find_and_update(query, update)
    }

    fn find_one(&self, query: &LeaseQuery) -> Result<Option<LeaseRecord>, StoreError> {
        (**self).find_one(query)
    }

    fn write_concern(&self) -> WriteConcern {
        (**self).write_concern()
    }

    fn with_write_concern(&self, concern: WriteConcern) -> Self {
        if self.write_concern() == concern {
            Self::clone(self)
        } else {
            Self::new((**self).with_write_concern(concern))
        }
    }
}
