//! Index key derivation.
//!
//! Each live order sits in two indexes: the customer's personal index and
//! the index of its region topic. [`KeyDeriver`] and [`TopicResolver`] name
//! those two keys, and [`IndexSet`] carries the pair through a transaction.

use rustc_hash::FxHashMap;

use crate::error::StoreError;
use crate::store::StoreTransaction;
use crate::types::{Order, Score};

/// Maps a customer identifier to the key of that customer's index
pub trait KeyDeriver: Send + Sync {
    /// Storage key for the customer's index
    fn customer_key(&self, userkod: &str) -> String;
}

/// Maps an order to the key of its region/topic index
pub trait TopicResolver: Send + Sync {
    /// Storage key for the order's topic, or `None` if the region is unknown
    fn topic_key(&self, order: &Order) -> Option<String>;
}

/// Customer keys with hyphens removed
///
/// `"ab-cd"` becomes `"abcd"`, optionally behind a fixed prefix.
#[derive(Debug, Clone, Default)]
pub struct HyphenlessKeys {
    prefix: String,
}

impl HyphenlessKeys {
    /// Derive keys without a prefix
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend `prefix` to every derived key
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

impl KeyDeriver for HyphenlessKeys {
    fn customer_key(&self, userkod: &str) -> String {
        let mut key = String::with_capacity(self.prefix.len() + userkod.len());
        key.push_str(&self.prefix);
        key.extend(userkod.chars().filter(|&c| c != '-'));
        key
    }
}

/// Region to topic translation table
///
/// Regions listed in the table resolve to their alias. Other regions resolve
/// to their trimmed, lowercased name, unless the resolver is strict.
#[derive(Debug, Clone, Default)]
pub struct RegionTopics {
    aliases: FxHashMap<String, String>,
    strict: bool,
}

impl RegionTopics {
    /// Resolver that falls back to the normalized region name
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver that only knows the regions in its table
    pub fn strict() -> Self {
        Self {
            aliases: FxHashMap::default(),
            strict: true,
        }
    }

    /// Map `region` to `topic`
    #[must_use]
    pub fn with_alias(mut self, region: impl AsRef<str>, topic: impl Into<String>) -> Self {
        self.aliases
            .insert(Self::normalize(region.as_ref()), topic.into());
        self
    }

    /// Number of aliased regions
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Check if the alias table is empty
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    fn normalize(region: &str) -> String {
        region.trim().to_lowercase()
    }
}

impl TopicResolver for RegionTopics {
    fn topic_key(&self, order: &Order) -> Option<String> {
        let region = Self::normalize(&order.region);
        if region.is_empty() {
            return None;
        }
        match self.aliases.get(&region) {
            Some(topic) => Some(topic.clone()),
            None if self.strict => None,
            None => Some(region),
        }
    }
}

/// The pair of indexes one order lives in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSet {
    customer: String,
    topic: String,
}

impl IndexSet {
    /// Create an index set from already derived keys
    pub fn new(customer: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            customer: customer.into(),
            topic: topic.into(),
        }
    }

    /// Customer index key
    pub fn customer(&self) -> &str {
        &self.customer
    }

    /// Topic index key
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Both keys, customer first
    pub fn keys(&self) -> [&str; 2] {
        [&self.customer, &self.topic]
    }

    /// Queue `payload` into every index of the set with one shared score
    ///
    /// # Errors
    ///
    /// Returns the first error the transaction reports. Operations queued
    /// before the failure stay in the transaction; the caller must abort it.
    pub fn add<T: StoreTransaction + ?Sized>(
        &self,
        tx: &mut T,
        payload: &str,
        score: Score,
    ) -> Result<(), StoreError> {
        for key in self.keys() {
            tx.zadd(key, payload, score)?;
        }
        Ok(())
    }

    /// Queue removal of `payload` from every index of the set
    ///
    /// # Errors
    ///
    /// Same contract as [`add`](Self::add).
    pub fn remove<T: StoreTransaction + ?Sized>(
        &self,
        tx: &mut T,
        payload: &str,
    ) -> Result<(), StoreError> {
        for key in self.keys() {
            tx.zrem(key, payload)?;
        }
        Ok(())
    }
}
