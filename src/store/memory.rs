//! In-process store backend.
//!
//! [`InMemoryStore`] keeps every index in one map behind a
//! `parking_lot::RwLock`. A commit applies its whole batch under a single
//! write guard, so readers observe either none or all of a transaction.

use std::future::{self, Future};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::StoreError;

use super::{Batch, IndexOp, OrderedStore, ScoredMember, SortedSet};

/// Ordered store held in memory.
///
/// Empty indexes are dropped after a commit, mirroring how Redis deletes a
/// sorted set once its last member is removed.
///
/// # Example
///
/// ```rust
/// use order_broadcast::store::{InMemoryStore, OrderedStore, StoreTransaction};
///
/// # tokio_test::block_on(async {
/// let store = InMemoryStore::new();
/// let mut tx = store.begin().unwrap();
/// tx.zadd("msk", "a", 2).unwrap();
/// tx.zadd("msk", "b", 1).unwrap();
/// store.commit(tx).await.unwrap();
///
/// let members = store.members("msk");
/// assert_eq!(members[0].member, "b");
/// # });
/// ```
#[derive(Debug)]
pub struct InMemoryStore {
    /// Indexes by key
    indexes: RwLock<FxHashMap<String, SortedSet>>,
    /// Successful commits so far
    commits: AtomicU64,
    /// Cleared to simulate an outage
    available: AtomicBool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            indexes: RwLock::new(FxHashMap::default()),
            commits: AtomicU64::new(0),
            available: AtomicBool::new(true),
        }
    }

    /// Mark the store as reachable or not
    ///
    /// While unavailable, `begin` and `commit` fail with
    /// [`StoreError::Unavailable`] and nothing is applied.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of committed transactions
    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Snapshot of an index in score order
    pub fn members(&self, key: &str) -> Vec<ScoredMember> {
        self.indexes
            .read()
            .get(key)
            .map(SortedSet::to_members)
            .unwrap_or_default()
    }

    /// Check if `member` is in the index at `key`
    pub fn contains(&self, key: &str, member: &str) -> bool {
        self.indexes
            .read()
            .get(key)
            .is_some_and(|set| set.contains(member))
    }

    /// Number of members in the index at `key`
    pub fn len(&self, key: &str) -> usize {
        self.indexes.read().get(key).map_or(0, SortedSet::len)
    }

    /// Keys of all non-empty indexes
    pub fn keys(&self) -> Vec<String> {
        self.indexes.read().keys().cloned().collect()
    }

    /// Check if the store holds no indexes
    pub fn is_empty(&self) -> bool {
        self.indexes.read().is_empty()
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store offline".into()))
        }
    }

    fn apply(&self, batch: Batch) -> Result<(), StoreError> {
        self.ensure_available()?;

        let mut indexes = self.indexes.write();
        for op in batch.into_ops() {
            match op {
                IndexOp::Add { key, member, score } => {
                    indexes.entry(key).or_default().add(&member, score);
                }
                IndexOp::Remove { key, member } => {
                    if let Some(set) = indexes.get_mut(&key) {
                        set.remove(&member);
                        if set.is_empty() {
                            indexes.remove(&key);
                        }
                    }
                }
            }
        }
        drop(indexes);

        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl OrderedStore for InMemoryStore {
    type Tx = Batch;

    fn begin(&self) -> Result<Batch, StoreError> {
        self.ensure_available()?;
        Ok(Batch::new())
    }

    fn commit(&self, tx: Batch) -> impl Future<Output = Result<(), StoreError>> + Send {
        future::ready(self.apply(tx))
    }

    fn abort(&self, tx: Batch) {
        drop(tx);
    }

    fn range(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Vec<ScoredMember>, StoreError>> + Send {
        let result = self.ensure_available().map(|()| self.members(key));
        future::ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreTransaction;

    fn commit(store: &InMemoryStore, ops: &[IndexOp]) -> Result<(), StoreError> {
        let mut tx = store.begin()?;
        for op in ops {
            match op {
                IndexOp::Add { key, member, score } => tx.zadd(key, member, *score)?,
                IndexOp::Remove { key, member } => tx.zrem(key, member)?,
            }
        }
        tokio_test::block_on(store.commit(tx))
    }

    #[test]
    fn test_nothing_visible_before_commit() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().unwrap();
        tx.zadd("abcd", "p", 1).unwrap();
        tx.zadd("msk", "p", 1).unwrap();

        assert!(store.is_empty());

        tokio_test::block_on(store.commit(tx)).unwrap();
        assert!(store.contains("abcd", "p"));
        assert!(store.contains("msk", "p"));
        assert_eq!(store.commits(), 1);
    }

    #[test]
    fn test_abort_discards() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().unwrap();
        tx.zadd("abcd", "p", 1).unwrap();
        store.abort(tx);

        assert!(store.is_empty());
        assert_eq!(store.commits(), 0);
    }

    #[test]
    fn test_empty_index_dropped() {
        let store = InMemoryStore::new();
        commit(&store, &[IndexOp::add("k", "p", 1)]).unwrap();
        commit(&store, &[IndexOp::remove("k", "p")]).unwrap();

        assert!(store.keys().is_empty());
        assert_eq!(store.len("k"), 0);
    }

    #[test]
    fn test_remove_from_missing_index() {
        let store = InMemoryStore::new();
        commit(&store, &[IndexOp::remove("nobody", "p")]).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.commits(), 1);
    }

    #[test]
    fn test_unavailable_applies_nothing() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().unwrap();
        tx.zadd("k", "p", 1).unwrap();

        store.set_available(false);
        let err = tokio_test::block_on(store.commit(tx)).unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(store.begin().is_err());

        store.set_available(true);
        assert!(store.is_empty());
    }

    #[test]
    fn test_range_in_score_order() {
        let store = InMemoryStore::new();
        commit(
            &store,
            &[
                IndexOp::add("msk", "second", 20),
                IndexOp::add("msk", "first", 10),
            ],
        )
        .unwrap();

        let members = tokio_test::block_on(store.range("msk")).unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].member, "first");
        assert_eq!(members[1].score, 20);
        assert!(tokio_test::block_on(store.range("other")).unwrap().is_empty());
    }
}
