//! Publisher configuration.
//!
//! This module provides the [`Config`] struct for the settings that shape a
//! publish or retract: commit timeout, where the notification happens
//! relative to commit, and how keys and the store connection are set up.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;

/// Environment variable: commit timeout in milliseconds, `0` disables it
pub const ENV_COMMIT_TIMEOUT_MS: &str = "ORDER_BROADCAST_COMMIT_TIMEOUT_MS";
/// Environment variable: `before_commit` or `after_commit`
pub const ENV_NOTIFY: &str = "ORDER_BROADCAST_NOTIFY";
/// Environment variable: prefix for customer index keys
pub const ENV_KEY_PREFIX: &str = "ORDER_BROADCAST_KEY_PREFIX";
/// Environment variable: Redis connection URL
pub const ENV_REDIS_URL: &str = "ORDER_BROADCAST_REDIS_URL";

/// When the notifier runs relative to the commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyPolicy {
    /// Notify while the transaction is open; a notifier error aborts it.
    /// Subscribers may hear about a transaction whose commit then fails.
    #[default]
    BeforeCommit,
    /// Notify only after a confirmed commit
    AfterCommit,
}

impl FromStr for NotifyPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "before_commit" | "before" => Ok(NotifyPolicy::BeforeCommit),
            "after_commit" | "after" => Ok(NotifyPolicy::AfterCommit),
            other => Err(Error::Config(format!("unknown notify policy: {other}"))),
        }
    }
}

impl fmt::Display for NotifyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyPolicy::BeforeCommit => write!(f, "before_commit"),
            NotifyPolicy::AfterCommit => write!(f, "after_commit"),
        }
    }
}

/// Configuration for an [`OrderPublisher`](crate::publisher::OrderPublisher)
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use order_broadcast::config::{Config, NotifyPolicy};
///
/// let config = Config::new()
///     .with_commit_timeout(Some(Duration::from_secs(2)))
///     .with_notify_policy(NotifyPolicy::AfterCommit);
///
/// assert_eq!(config.notify_policy(), NotifyPolicy::AfterCommit);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Upper bound on a commit, `None` to wait forever
    commit_timeout: Option<Duration>,

    /// Notification placement
    notify_policy: NotifyPolicy,

    /// Prefix for customer index keys
    customer_key_prefix: String,

    /// Redis URL for [`RedisStore`](crate::store) (feature `redis`)
    redis_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Create a configuration with defaults
    ///
    /// 5 second commit timeout, notification before commit, no key prefix.
    pub fn new() -> Self {
        Self {
            commit_timeout: Some(Duration::from_secs(5)),
            notify_policy: NotifyPolicy::default(),
            customer_key_prefix: String::new(),
            redis_url: None,
        }
    }

    /// Build a configuration from `ORDER_BROADCAST_*` environment variables
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a variable is set to a malformed value.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = Self::new();

        if let Some(raw) = lookup(ENV_COMMIT_TIMEOUT_MS) {
            let ms: u64 = raw.trim().parse().map_err(|_| {
                Error::Config(format!("{ENV_COMMIT_TIMEOUT_MS} is not a number: {raw}"))
            })?;
            config.commit_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(raw) = lookup(ENV_NOTIFY) {
            config.notify_policy = raw.parse()?;
        }
        if let Some(prefix) = lookup(ENV_KEY_PREFIX) {
            config.customer_key_prefix = prefix;
        }
        if let Some(url) = lookup(ENV_REDIS_URL) {
            if url.trim().is_empty() {
                return Err(Error::Config(format!("{ENV_REDIS_URL} is empty")));
            }
            config.redis_url = Some(url);
        }

        Ok(config)
    }

    /// Set the commit timeout
    #[must_use]
    pub fn with_commit_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.commit_timeout = timeout;
        self
    }

    /// Set the notification placement
    #[must_use]
    pub fn with_notify_policy(mut self, policy: NotifyPolicy) -> Self {
        self.notify_policy = policy;
        self
    }

    /// Set the customer key prefix
    #[must_use]
    pub fn with_customer_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.customer_key_prefix = prefix.into();
        self
    }

    /// Set the Redis URL
    #[must_use]
    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }

    /// Get the commit timeout
    pub fn commit_timeout(&self) -> Option<Duration> {
        self.commit_timeout
    }

    /// Get the notification placement
    pub fn notify_policy(&self) -> NotifyPolicy {
        self.notify_policy
    }

    /// Get the customer key prefix
    pub fn customer_key_prefix(&self) -> &str {
        &self.customer_key_prefix
    }

    /// Get the Redis URL
    pub fn redis_url(&self) -> Option<&str> {
        self.redis_url.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::new();
        assert_eq!(config.commit_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.notify_policy(), NotifyPolicy::BeforeCommit);
        assert_eq!(config.customer_key_prefix(), "");
        assert_eq!(config.redis_url(), None);
    }

    #[test]
    fn test_builder_pattern() {
        let config = Config::new()
            .with_commit_timeout(None)
            .with_notify_policy(NotifyPolicy::AfterCommit)
            .with_customer_key_prefix("c:")
            .with_redis_url("redis://localhost");

        assert_eq!(config.commit_timeout(), None);
        assert_eq!(config.notify_policy(), NotifyPolicy::AfterCommit);
        assert_eq!(config.customer_key_prefix(), "c:");
        assert_eq!(config.redis_url(), Some("redis://localhost"));
    }

    #[test]
    fn test_from_lookup() {
        let config = Config::from_lookup(lookup(&[
            (ENV_COMMIT_TIMEOUT_MS, "250"),
            (ENV_NOTIFY, "After_Commit"),
            (ENV_KEY_PREFIX, "customer:"),
        ]))
        .unwrap();

        assert_eq!(config.commit_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.notify_policy(), NotifyPolicy::AfterCommit);
        assert_eq!(config.customer_key_prefix(), "customer:");
    }

    #[test]
    fn test_zero_timeout_disables() {
        let config = Config::from_lookup(lookup(&[(ENV_COMMIT_TIMEOUT_MS, "0")])).unwrap();
        assert_eq!(config.commit_timeout(), None);
    }

    #[test]
    fn test_malformed_values() {
        let err = Config::from_lookup(lookup(&[(ENV_COMMIT_TIMEOUT_MS, "soon")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::from_lookup(lookup(&[(ENV_NOTIFY, "sometimes")])).unwrap_err();
        assert!(err.to_string().contains("sometimes"));

        assert!(Config::from_lookup(lookup(&[(ENV_REDIS_URL, " ")])).is_err());
    }

    #[test]
    fn test_policy_display_roundtrip() {
        for policy in [NotifyPolicy::BeforeCommit, NotifyPolicy::AfterCommit] {
            assert_eq!(policy.to_string().parse::<NotifyPolicy>().unwrap(), policy);
        }
    }
}
