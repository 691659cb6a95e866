//! Error types for the order-broadcast crate.
//!
//! Every failure of a publish or retract is surfaced to the caller as an
//! [`Error`]. The variants separate permanent failures (a payload that
//! cannot be encoded, an order with no customer) from transient ones (a
//! store that rejected the batch, a commit that timed out), so callers can
//! decide whether re-invoking the whole operation makes sense.

use thiserror::Error;

/// The main error type for this crate
#[derive(Debug, Error)]
pub enum Error {
    /// JSON serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A non-JSON codec could not produce a consistent payload
    #[error("codec error: {0}")]
    Codec(String),

    /// The backing store rejected or could not execute the transaction
    #[error("store transaction failed: {0}")]
    Store(#[from] StoreError),

    /// The notifier could not be reached or rejected the message
    #[error("notification failed (committed: {committed}): {source}")]
    Notification {
        /// Whether the index mutations were already committed
        committed: bool,
        /// Underlying notifier error
        source: NotifyError,
    },

    /// Order is missing a customer identifier or has no resolvable topic
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    /// Invalid configuration (bad env value, missing field)
    #[error("configuration error: {0}")]
    Config(String),

    /// Commit did not complete within the configured timeout
    #[error("operation timed out")]
    Timeout,
}

/// Error from an [`OrderedStore`](crate::store::OrderedStore) backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// Operation targeted an empty key
    #[error("invalid index key: {0:?}")]
    InvalidKey(String),

    /// Backend-specific failure
    #[error("backend error: {0}")]
    Backend(String),

    /// Backend cannot be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Redis client error
    #[cfg(feature = "redis")]
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Error from a [`Notifier`](crate::notify::Notifier)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// Notifier has been shut down
    #[error("notifier closed")]
    Closed,

    /// Transport rejected the message
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Alias used in operation signatures
pub type PublishError = Error;

impl Error {
    /// Wrap a notifier failure that happened before commit
    pub fn notification(source: NotifyError) -> Self {
        Error::Notification {
            committed: false,
            source,
        }
    }

    /// Whether re-invoking the whole operation may succeed
    ///
    /// Store failures and timeouts are transient. A notifier failure is only
    /// worth retrying when nothing was committed; otherwise a retry would
    /// duplicate index entries under a new score.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Store(_) | Error::Timeout => true,
            Error::Notification { committed, .. } => !committed,
            Error::Serialization(_)
            | Error::Codec(_)
            | Error::InvalidOrder(_)
            | Error::Config(_) => false,
        }
    }

    /// Whether the index mutations were applied despite the error
    pub fn is_committed(&self) -> bool {
        matches!(
            self,
            Error::Notification {
                committed: true,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = Error::Store(StoreError::InvalidKey(String::new()));
        assert!(err.to_string().contains("store transaction failed"));
        assert!(err.to_string().contains("\"\""));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(Error::Timeout.is_retryable());
        assert!(Error::Store(StoreError::Backend("down".into())).is_retryable());
        assert!(!Error::InvalidOrder("no customer".into()).is_retryable());
        assert!(!Error::Codec("bad".into()).is_retryable());

        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        assert!(!Error::from(json_err).is_retryable());
    }

    #[test]
    fn test_notification_after_commit() {
        let before = Error::notification(NotifyError::Closed);
        assert!(before.is_retryable());
        assert!(!before.is_committed());

        let after = Error::Notification {
            committed: true,
            source: NotifyError::Rejected("full".into()),
        };
        assert!(!after.is_retryable());
        assert!(after.is_committed());
        assert!(after.to_string().contains("full"));
    }
}
