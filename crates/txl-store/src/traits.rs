use std::sync::Arc;

use crate::error::StoreResult;
use crate::predicate::Predicate;

/// One entry in a key's revision history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Revision {
    /// 1-based position of this revision within the key's history.
    pub version: u64,
    /// The value as written.
    pub value: Vec<u8>,
}

/// A query match: the key and its latest value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryHit {
    pub key: String,
    pub value: Vec<u8>,
}

/// Journaled, versioned key-value store.
///
/// All implementations must satisfy these invariants:
/// - `put` never rewrites history: it appends a new revision and makes it the
///   latest value for the key.
/// - Writes to the same key are serialized; a reader always sees its own writes.
/// - `history_of` returns revisions oldest first, in commit order.
/// - There is no cross-key atomicity.
pub trait VersionedStore: Send + Sync {
    /// Append a revision for `key` and make it the latest value.
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Read the latest value for `key`.
    ///
    /// Returns `Ok(None)` if the key has never been written.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Every revision ever written for `key`, oldest first.
    ///
    /// A key with no history yields an empty vector.
    fn history_of(&self, key: &str) -> StoreResult<Vec<Revision>>;

    /// Latest values whose JSON document satisfies `predicate`.
    ///
    /// Values that are not JSON documents never match. Result order is
    /// backend-defined.
    fn query(&self, predicate: &Predicate) -> StoreResult<Vec<QueryHit>>;

    /// Write `value` only if `key` has no value yet. Returns `false` when the
    /// key was already present and nothing was written.
    ///
    /// The default implementation is a `get` followed by a `put` and is NOT
    /// atomic: two concurrent callers can both observe the key as absent and
    /// both write. Backends that can check and write under one lock override it.
    fn put_if_absent(&self, key: &str, value: &[u8]) -> StoreResult<bool> {
        if self.get(key)?.is_some() {
            return Ok(false);
        }
        self.put(key, value)?;
        Ok(true)
    }

    /// Check whether `key` currently has a value.
    fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

impl<T: VersionedStore + ?Sized> VersionedStore for Arc<T> {
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        (**self).put(key, value)
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn history_of(&self, key: &str) -> StoreResult<Vec<Revision>> {
        (**self).history_of(key)
    }

    fn query(&self, predicate: &Predicate) -> StoreResult<Vec<QueryHit>> {
        (**self).query(predicate)
    }

    fn put_if_absent(&self, key: &str, value: &[u8]) -> StoreResult<bool> {
        (**self).put_if_absent(key, value)
    }

    fn contains(&self, key: &str) -> StoreResult<bool> {
        (**self).contains(key)
    }
}

impl<T: VersionedStore + ?Sized> VersionedStore for &T {
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        (**self).put(key, value)
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn history_of(&self, key: &str) -> StoreResult<Vec<Revision>> {
        (**self).history_of(key)
    }

    fn query(&self, predicate: &Predicate) -> StoreResult<Vec<QueryHit>> {
        (**self).query(predicate)
    }

    fn put_if_absent(&self, key: &str, value: &[u8]) -> StoreResult<bool> {
        (**self).put_if_absent(key, value)
    }

    fn contains(&self, key: &str) -> StoreResult<bool> {
        (**self).contains(key)
    }
}
