//! Ordered-set storage with atomic multi-key transactions.
//!
//! A store holds any number of indexes, each an ordered set of string
//! members sorted by a numeric [`Score`]. Mutations are never applied one by
//! one: they are queued into a transaction and become visible together on
//! [`OrderedStore::commit`], or not at all on [`OrderedStore::abort`].
//!
//! # Example
//!
//! ```rust
//! use order_broadcast::store::{InMemoryStore, OrderedStore, StoreTransaction};
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryStore::new();
//!
//! let mut tx = store.begin()?;
//! tx.zadd("abcd", "order-1", 10)?;
//! tx.zadd("msk", "order-1", 10)?;
//! store.commit(tx).await?;
//!
//! assert!(store.contains("msk", "order-1"));
//! # Ok::<(), order_broadcast::error::StoreError>(())
//! # }).unwrap();
//! ```

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;
pub mod scope;
pub mod sorted_set;

use std::future::Future;

pub use memory::InMemoryStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;
pub use scope::{with_transaction, TxOutcome};
pub use sorted_set::SortedSet;

use crate::error::StoreError;
use crate::types::Score;

/// A member of an index together with its score
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredMember {
    /// Member value (a serialized order)
    pub member: String,
    /// Score the member was added with
    pub score: Score,
}

/// One queued index mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOp {
    /// Add `member` to `key` with `score`
    Add {
        /// Index key
        key: String,
        /// Member value
        member: String,
        /// Member score
        score: Score,
    },
    /// Remove `member` from `key`; a missing member is a no-op
    Remove {
        /// Index key
        key: String,
        /// Member value
        member: String,
    },
}

impl IndexOp {
    /// Create an add operation
    pub fn add(key: impl Into<String>, member: impl Into<String>, score: Score) -> Self {
        IndexOp::Add {
            key: key.into(),
            member: member.into(),
            score,
        }
    }

    /// Create a remove operation
    pub fn remove(key: impl Into<String>, member: impl Into<String>) -> Self {
        IndexOp::Remove {
            key: key.into(),
            member: member.into(),
        }
    }

    /// Key this operation targets
    pub fn key(&self) -> &str {
        match self {
            IndexOp::Add { key, .. } | IndexOp::Remove { key, .. } => key,
        }
    }
}

/// Queueing side of a transaction
///
/// Queued operations have no effect until the owning store commits the
/// transaction. They are applied in queue order.
pub trait StoreTransaction: Send {
    /// Queue adding `member` to the index at `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the operation cannot be queued.
    fn zadd(&mut self, key: &str, member: &str, score: Score) -> Result<(), StoreError>;

    /// Queue removing `member` from the index at `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the operation cannot be queued.
    fn zrem(&mut self, key: &str, member: &str) -> Result<(), StoreError>;

    /// Number of queued operations
    fn len(&self) -> usize;

    /// Check if nothing has been queued
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Backing store for the customer and topic indexes
///
/// Implementations must keep transaction state inside the transaction value:
/// concurrent callers each hold their own and never see each other's queued
/// operations.
pub trait OrderedStore: Send + Sync {
    /// Transaction type handed out by [`begin`](Self::begin)
    type Tx: StoreTransaction;

    /// Open a transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot start a transaction.
    fn begin(&self) -> Result<Self::Tx, StoreError>;

    /// Apply every queued operation atomically
    fn commit(&self, tx: Self::Tx) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Discard every queued operation
    fn abort(&self, tx: Self::Tx);

    /// Members of the index at `key` in ascending score order
    ///
    /// A missing index reads as empty.
    fn range(&self, key: &str)
        -> impl Future<Output = Result<Vec<ScoredMember>, StoreError>> + Send;
}

/// Client-side operation queue
///
/// Both bundled backends buffer operations here and only talk to the
/// underlying storage on commit.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    ops: Vec<IndexOp>,
}

impl Batch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Queued operations in queue order
    pub fn ops(&self) -> &[IndexOp] {
        &self.ops
    }

    /// Take ownership of the queued operations
    pub fn into_ops(self) -> Vec<IndexOp> {
        self.ops
    }

    fn check_key(key: &str) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(())
    }
}

impl StoreTransaction for Batch {
    fn zadd(&mut self, key: &str, member: &str, score: Score) -> Result<(), StoreError> {
        Self::check_key(key)?;
        self.ops.push(IndexOp::add(key, member, score));
        Ok(())
    }

    fn zrem(&mut self, key: &str, member: &str) -> Result<(), StoreError> {
        Self::check_key(key)?;
        self.ops.push(IndexOp::remove(key, member));
        Ok(())
    }

    fn len(&self) -> usize {
        self.ops.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_keeps_queue_order() {
        let mut batch = Batch::new();
        assert!(batch.is_empty());

        batch.zadd("a", "m", 1).unwrap();
        batch.zrem("b", "m").unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.ops()[0].key(), "a");
        assert_eq!(batch.ops()[1], IndexOp::remove("b", "m"));
    }

    #[test]
    fn test_batch_rejects_empty_key() {
        let mut batch = Batch::new();
        let err = batch.zadd("", "m", 1).unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
        assert!(batch.zrem("", "m").is_err());
        assert!(batch.is_empty());
    }
}
