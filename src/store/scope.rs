//! Scoped transactions.
//!
//! [`with_transaction`] opens a transaction, lets a closure queue work into
//! it, and then either commits or aborts. Abort runs on every early exit of
//! the closure; commit runs only when the closure returned `Ok`.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Error;

use super::{OrderedStore, StoreTransaction};

/// Result of a scoped transaction
#[derive(Debug)]
pub enum TxOutcome<T> {
    /// Every queued operation was applied; carries the closure's value
    Committed(T),
    /// Nothing was applied; carries the cause
    Aborted(Error),
}

impl<T> TxOutcome<T> {
    /// Check if the transaction committed
    pub fn is_committed(&self) -> bool {
        matches!(self, TxOutcome::Committed(_))
    }

    /// Convert into a `Result`
    ///
    /// # Errors
    ///
    /// Returns the abort cause.
    pub fn into_result(self) -> Result<T, Error> {
        match self {
            TxOutcome::Committed(value) => Ok(value),
            TxOutcome::Aborted(cause) => Err(cause),
        }
    }
}

/// Run `build` inside a transaction on `store`
///
/// `build` queues operations and returns a value that is handed back on
/// commit. If it returns `Err`, the transaction is aborted and the error
/// becomes the abort cause. With `timeout` set, a commit that has not
/// finished in time reports [`Error::Timeout`]; on a remote store its
/// effects are then unknown.
pub async fn with_transaction<S, T, F>(
    store: &S,
    timeout: Option<Duration>,
    build: F,
) -> TxOutcome<T>
where
    S: OrderedStore,
    F: FnOnce(&mut S::Tx) -> Result<T, Error>,
{
    let mut tx = match store.begin() {
        Ok(tx) => tx,
        Err(e) => return TxOutcome::Aborted(e.into()),
    };

    let value = match build(&mut tx) {
        Ok(value) => value,
        Err(cause) => {
            warn!(ops = tx.len(), error = %cause, "Aborting transaction");
            store.abort(tx);
            return TxOutcome::Aborted(cause);
        }
    };

    let ops = tx.len();
    let commit = store.commit(tx);
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, commit).await {
            Ok(result) => result.map_err(Error::from),
            Err(_) => Err(Error::Timeout),
        },
        None => commit.await.map_err(Error::from),
    };

    match result {
        Ok(()) => {
            debug!(ops, "Transaction committed");
            TxOutcome::Committed(value)
        }
        Err(cause) => {
            warn!(ops, error = %cause, "Commit failed");
            TxOutcome::Aborted(cause)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn test_commit_on_ok() {
        let store = InMemoryStore::new();
        let outcome = with_transaction(&store, None, |tx| {
            tx.zadd("k", "m", 1)?;
            Ok(42)
        })
        .await;

        assert!(outcome.is_committed());
        assert_eq!(outcome.into_result().unwrap(), 42);
        assert!(store.contains("k", "m"));
    }

    #[tokio::test]
    async fn test_abort_on_err() {
        let store = InMemoryStore::new();
        let outcome: TxOutcome<()> = with_transaction(&store, None, |tx| {
            tx.zadd("k", "m", 1)?;
            Err(Error::Codec("boom".into()))
        })
        .await;

        assert!(!outcome.is_committed());
        assert!(matches!(outcome.into_result(), Err(Error::Codec(_))));
        assert!(store.is_empty());
        assert_eq!(store.commits(), 0);
    }

    #[tokio::test]
    async fn test_queue_failure_aborts_earlier_ops() {
        let store = InMemoryStore::new();
        let outcome = with_transaction(&store, None, |tx| {
            tx.zadd("k", "m", 1)?;
            tx.zadd("", "m", 1)?;
            Ok(())
        })
        .await;

        assert!(matches!(
            outcome,
            TxOutcome::Aborted(Error::Store(StoreError::InvalidKey(_)))
        ));
        assert!(!store.contains("k", "m"));
    }

    #[tokio::test]
    async fn test_begin_failure() {
        let store = InMemoryStore::new();
        store.set_available(false);

        let mut called = false;
        let outcome = with_transaction(&store, Some(Duration::from_secs(1)), |_| {
            called = true;
            Ok(())
        })
        .await;

        assert!(!called);
        assert!(matches!(outcome.into_result(), Err(Error::Store(_))));
    }
}
