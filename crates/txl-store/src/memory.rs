use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tracing::warn;

use crate::error::{StoreError, StoreResult};
use crate::predicate::Predicate;
use crate::traits::{QueryHit, Revision, VersionedStore};

/// In-memory, HashMap-based versioned store.
///
/// Intended for tests and embedding, and used as the index behind
/// [`JournalStore`](crate::JournalStore). Every key maps to its full list of
/// revisions; the last one is the latest value. `put_if_absent` checks and
/// writes under a single write lock, so it is atomic.
pub struct InMemoryVersionedStore {
    revisions: RwLock<HashMap<String, Vec<Vec<u8>>>>,
}

impl InMemoryVersionedStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            revisions: RwLock::new(HashMap::new()),
        }
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.read_map().map(|map| map.len()).unwrap_or_default()
    }

    /// Returns `true` if no key has ever been written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total revisions across all keys.
    pub fn revision_count(&self) -> usize {
        self.read_map()
            .map(|map| map.values().map(Vec::len).sum())
            .unwrap_or_default()
    }

    /// Sorted list of all keys.
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        let map = self.read_map()?;
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn read_map(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<String, Vec<Vec<u8>>>>> {
        self.revisions.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write_map(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<String, Vec<Vec<u8>>>>> {
        self.revisions.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl Default for InMemoryVersionedStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_key(key: &str) -> StoreResult<()> {
    if key.is_empty() {
        return Err(StoreError::EmptyKey);
    }
    Ok(())
}

impl VersionedStore for InMemoryVersionedStore {
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        check_key(key)?;
        let mut map = self.write_map()?;
        map.entry(key.to_string()).or_default().push(value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let map = self.read_map()?;
        Ok(map.get(key).and_then(|revs| revs.last()).cloned())
    }

    fn history_of(&self, key: &str) -> StoreResult<Vec<Revision>> {
        let map = self.read_map()?;
        let revisions = map
            .get(key)
            .map(|revs| {
                revs.iter()
                    .enumerate()
                    .map(|(index, value)| Revision {
                        version: index as u64 + 1,
                        value: value.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(revisions)
    }

    fn query(&self, predicate: &Predicate) -> StoreResult<Vec<QueryHit>> {
        predicate.validate()?;
        let map = self.read_map()?;

        let mut hits = Vec::new();
        for (key, revs) in map.iter() {
            let Some(latest) = revs.last() else {
                continue;
            };
            let document: Value = match serde_json::from_slice(latest) {
                Ok(document) => document,
                Err(e) => {
                    warn!(key = %key, error = %e, "value is not a JSON document; skipped by query");
                    continue;
                }
            };
            if predicate.matches(&document) {
                hits.push(QueryHit {
                    key: key.clone(),
                    value: latest.clone(),
                });
            }
        }

        hits.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(hits)
    }

    fn put_if_absent(&self, key: &str, value: &[u8]) -> StoreResult<bool> {
        check_key(key)?;
        let mut map = self.write_map()?;
        let revs = map.entry(key.to_string()).or_default();
        if !revs.is_empty() {
            return Ok(false);
        }
        revs.push(value.to_vec());
        Ok(true)
    }
}

impl std::fmt::Debug for InMemoryVersionedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVersionedStore")
            .field("key_count", &self.len())
            .field("revision_count", &self.revision_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn account_query(account: &str) -> Predicate {
        Predicate::any_of([
            Predicate::eq("fromAccount", account),
            Predicate::eq("toAccount", account),
        ])
    }

    // -----------------------------------------------------------------------
    // Latest value / history
    // -----------------------------------------------------------------------

    #[test]
    fn put_and_get() {
        let store = InMemoryVersionedStore::new();
        store.put("k", b"v1").unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"v1".to_vec()));
    }

    #[test]
    fn absent_key_is_none_not_error() {
        let store = InMemoryVersionedStore::new();
        assert_eq!(store.get("missing").unwrap(), None);
        assert!(!store.contains("missing").unwrap());
        assert!(store.history_of("missing").unwrap().is_empty());
    }

    #[test]
    fn zero_length_value_is_present() {
        let store = InMemoryVersionedStore::new();
        store.put("k", b"").unwrap();
        assert_eq!(store.get("k").unwrap(), Some(Vec::new()));
        assert!(store.contains("k").unwrap());
    }

    #[test]
    fn history_is_in_commit_order() {
        let store = InMemoryVersionedStore::new();
        store.put("k", b"one").unwrap();
        store.put("k", b"two").unwrap();
        store.put("k", b"three").unwrap();

        let history = store.history_of("k").unwrap();
        let values: Vec<&[u8]> = history.iter().map(|r| r.value.as_slice()).collect();
        assert_eq!(values, vec![&b"one"[..], &b"two"[..], &b"three"[..]]);
        assert_eq!(
            history.iter().map(|r| r.version).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(store.get("k").unwrap(), Some(b"three".to_vec()));
    }

    #[test]
    fn empty_key_rejected() {
        let store = InMemoryVersionedStore::new();
        assert!(matches!(store.put("", b"x"), Err(StoreError::EmptyKey)));
        assert!(matches!(store.put_if_absent("", b"x"), Err(StoreError::EmptyKey)));
    }

    // -----------------------------------------------------------------------
    // Conditional put
    // -----------------------------------------------------------------------

    #[test]
    fn put_if_absent_writes_once() {
        let store = InMemoryVersionedStore::new();
        assert!(store.put_if_absent("k", b"first").unwrap());
        assert!(!store.put_if_absent("k", b"second").unwrap());
        assert_eq!(store.get("k").unwrap(), Some(b"first".to_vec()));
        assert_eq!(store.history_of("k").unwrap().len(), 1);
    }

    #[test]
    fn put_if_absent_is_atomic_under_contention() {
        let store = Arc::new(InMemoryVersionedStore::new());
        let handles: Vec<_> = (0..16u8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.put_if_absent("shared", &[i]).unwrap())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(store.history_of("shared").unwrap().len(), 1);
    }

    // -----------------------------------------------------------------------
    // Query
    // -----------------------------------------------------------------------

    #[test]
    fn query_matches_latest_documents() {
        let store = InMemoryVersionedStore::new();
        store
            .put("t1", br#"{"fromAccount":"A","toAccount":"B"}"#)
            .unwrap();
        store
            .put("t2", br#"{"fromAccount":"C","toAccount":"A"}"#)
            .unwrap();
        store
            .put("t3", br#"{"fromAccount":"C","toAccount":"D"}"#)
            .unwrap();

        let hits = store.query(&account_query("A")).unwrap();
        let keys: Vec<&str> = hits.iter().map(|h| h.key.as_str()).collect();
        assert_eq!(keys, vec!["t1", "t2"]);
    }

    #[test]
    fn query_ignores_superseded_revisions() {
        let store = InMemoryVersionedStore::new();
        store.put("t1", br#"{"fromAccount":"A"}"#).unwrap();
        store.put("t1", br#"{"fromAccount":"Z"}"#).unwrap();
        assert!(store.query(&account_query("A")).unwrap().is_empty());
        assert_eq!(store.query(&account_query("Z")).unwrap().len(), 1);
    }

    #[test]
    fn query_skips_non_json_values() {
        let store = InMemoryVersionedStore::new();
        store.put("raw", b"\x00\x01not json").unwrap();
        store.put("t1", br#"{"toAccount":"A"}"#).unwrap();
        let hits = store.query(&account_query("A")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, "t1");
    }

    #[test]
    fn malformed_query_is_an_error() {
        let store = InMemoryVersionedStore::new();
        let err = store.query(&Predicate::any_of(Vec::new())).unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery(_)));
    }

    // -----------------------------------------------------------------------
    // Utility methods
    // -----------------------------------------------------------------------

    #[test]
    fn counts_and_keys() {
        let store = InMemoryVersionedStore::default();
        assert!(store.is_empty());
        store.put("b", b"1").unwrap();
        store.put("a", b"1").unwrap();
        store.put("a", b"2").unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.revision_count(), 3);
        assert_eq!(store.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn blanket_impls_forward_conditional_put() {
        let store = Arc::new(InMemoryVersionedStore::new());
        let by_ref: &InMemoryVersionedStore = &store;
        assert!(VersionedStore::put_if_absent(&by_ref, "k", b"1").unwrap());
        assert!(!VersionedStore::put_if_absent(&store, "k", b"2").unwrap());
    }

    #[test]
    fn debug_format() {
        let store = InMemoryVersionedStore::new();
        store.put("x", b"1").unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryVersionedStore"));
        assert!(debug.contains("key_count"));
    }
}
