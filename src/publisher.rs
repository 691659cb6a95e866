//! Atomic publication and retraction of orders.
//!
//! [`OrderPublisher`] is the only component with a consistency contract:
//! an order is either present in both its customer index and its topic
//! index, or in neither. Each publish or retract is one store transaction;
//! the notification is sent once per call, before or after the commit
//! depending on [`NotifyPolicy`].

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::codec::{JsonCodec, OrderCodec};
use crate::config::{Config, NotifyPolicy};
use crate::error::{Error, NotifyError};
use crate::keys::{HyphenlessKeys, IndexSet, KeyDeriver, RegionTopics, TopicResolver};
use crate::notify::Notifier;
use crate::store::{with_transaction, OrderedStore, TxOutcome};
use crate::types::{Order, OrderEvent, OrderStatus};
use crate::Result;

/// Publishes and retracts orders across the customer and topic indexes
///
/// # Example
///
/// ```rust
/// use order_broadcast::notify::BroadcastNotifier;
/// use order_broadcast::store::InMemoryStore;
/// use order_broadcast::types::{Order, OrderStatus};
/// use order_broadcast::OrderPublisher;
///
/// # tokio_test::block_on(async {
/// let publisher = OrderPublisher::new(InMemoryStore::new(), BroadcastNotifier::default());
/// let order = Order::new(1, "ab-cd", "msk");
///
/// publisher.publish(&order).await?;
/// assert_eq!(publisher.topic_orders("msk").await?, vec![order.clone()]);
///
/// let rejected = publisher.retract(&order).await?;
/// assert_eq!(rejected.status, OrderStatus::Rejected);
/// assert!(publisher.customer_orders("ab-cd").await?.is_empty());
/// # Ok::<(), order_broadcast::Error>(())
/// # }).unwrap();
/// ```
pub struct OrderPublisher<S, N> {
    store: S,
    notifier: N,
    codec: Arc<dyn OrderCodec>,
    keys: Arc<dyn KeyDeriver>,
    topics: Arc<dyn TopicResolver>,
    clock: Arc<dyn Clock>,
    config: Config,
}

impl<S, N> fmt::Debug for OrderPublisher<S, N>
where
    S: fmt::Debug,
    N: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderPublisher")
            .field("store", &self.store)
            .field("notifier", &self.notifier)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S, N> OrderPublisher<S, N>
where
    S: OrderedStore,
    N: Notifier,
{
    /// Create a publisher with the default configuration
    ///
    /// Uses [`JsonCodec`], [`HyphenlessKeys`], [`RegionTopics`] and
    /// [`SystemClock`].
    pub fn new(store: S, notifier: N) -> Self {
        Self::with_config(store, notifier, Config::default())
    }

    /// Create a publisher with an explicit configuration
    pub fn with_config(store: S, notifier: N, config: Config) -> Self {
        let keys = HyphenlessKeys::new().with_prefix(config.customer_key_prefix());
        Self {
            store,
            notifier,
            codec: Arc::new(JsonCodec),
            keys: Arc::new(keys),
            topics: Arc::new(RegionTopics::new()),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replace the payload codec
    #[must_use]
    pub fn with_codec(mut self, codec: impl OrderCodec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Replace the customer key derivation
    #[must_use]
    pub fn with_key_deriver(mut self, keys: impl KeyDeriver + 'static) -> Self {
        self.keys = Arc::new(keys);
        self
    }

    /// Replace the topic resolution
    #[must_use]
    pub fn with_topic_resolver(mut self, topics: impl TopicResolver + 'static) -> Self {
        self.topics = Arc::new(topics);
        self
    }

    /// Replace the score source
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Get a reference to the store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get a reference to the notifier
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Derive both index keys of an order
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOrder`] if the order has no customer
    /// identifier or its topic cannot be resolved.
    pub fn index_set(&self, order: &Order) -> Result<IndexSet> {
        if order.userkod.trim().is_empty() {
            return Err(Error::InvalidOrder(format!(
                "order {} has no customer identifier",
                order.id
            )));
        }
        let customer = self.keys.customer_key(&order.userkod);
        if customer.is_empty() {
            return Err(Error::InvalidOrder(format!(
                "order {} customer {:?} derives an empty key",
                order.id, order.userkod
            )));
        }

        let topic = self
            .topics
            .topic_key(order)
            .filter(|topic| !topic.is_empty())
            .ok_or_else(|| {
                Error::InvalidOrder(format!(
                    "order {} has no resolvable topic for region {:?}",
                    order.id, order.region
                ))
            })?;

        Ok(IndexSet::new(customer, topic))
    }

    /// Publish an order into its customer and topic indexes
    ///
    /// Both inserts share one score and commit together. Subscribers of the
    /// topic receive the same payload that was indexed.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is invalid or already `COMPLETED` or
    /// `REJECTED`, or if encoding, the store, or the notifier fails. Unless
    /// the error reports [`is_committed`](Error::is_committed), neither index
    /// changed.
    pub async fn publish(&self, order: &Order) -> Result<Order> {
        if !order.status.is_live() {
            return Err(Error::InvalidOrder(format!(
                "order {} is {:?} and cannot be published",
                order.id, order.status
            )));
        }
        let index = self.index_set(order)?;
        let score = self.clock.now_ms();
        let policy = self.config.notify_policy();

        let outcome = with_transaction(&self.store, self.config.commit_timeout(), |tx| {
            let payload = self.codec.encode(order)?;
            index.add(tx, &payload, score)?;
            debug!(
                order_id = order.id,
                customer_key = index.customer(),
                topic = index.topic(),
                score,
                "Queued index inserts"
            );

            let event = OrderEvent::new(index.topic(), payload);
            if policy == NotifyPolicy::BeforeCommit {
                self.dispatch(&event)?;
            }
            Ok(event)
        })
        .await;

        let event = Self::settle("publish", order, outcome)?;
        if policy == NotifyPolicy::AfterCommit {
            self.dispatch_committed(&event)?;
        }

        info!(
            order_id = order.id,
            customer_key = index.customer(),
            topic = index.topic(),
            "Order published"
        );
        Ok(order.clone())
    }

    /// Retract an order from both indexes and announce its rejection
    ///
    /// The entries are removed by the payload of `order` as given; the
    /// notification carries the payload of the `REJECTED` copy. `order`
    /// itself is left untouched and the rejected copy is returned.
    ///
    /// Retracting an order that is no longer indexed is not an error.
    ///
    /// # Errors
    ///
    /// Same contract as [`publish`](Self::publish).
    pub async fn retract(&self, order: &Order) -> Result<Order> {
        let index = self.index_set(order)?;
        let policy = self.config.notify_policy();

        let outcome = with_transaction(&self.store, self.config.commit_timeout(), |tx| {
            let indexed = self.codec.encode(order)?;
            index.remove(tx, &indexed)?;
            debug!(
                order_id = order.id,
                customer_key = index.customer(),
                topic = index.topic(),
                "Queued index removals"
            );

            let rejected = order.with_status(OrderStatus::Rejected);
            let event = OrderEvent::new(index.topic(), self.codec.encode(&rejected)?);
            if policy == NotifyPolicy::BeforeCommit {
                self.dispatch(&event)?;
            }
            Ok((rejected, event))
        })
        .await;

        let (rejected, event) = Self::settle("retract", order, outcome)?;
        if policy == NotifyPolicy::AfterCommit {
            self.dispatch_committed(&event)?;
        }

        info!(
            order_id = order.id,
            customer_key = index.customer(),
            topic = index.topic(),
            "Order retracted"
        );
        Ok(rejected)
    }

    /// Active orders of a customer, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn customer_orders(&self, userkod: &str) -> Result<Vec<Order>> {
        let key = self.keys.customer_key(userkod);
        self.read_index(&key).await
    }

    /// Active orders of a topic, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn topic_orders(&self, topic: &str) -> Result<Vec<Order>> {
        self.read_index(topic).await
    }

    async fn read_index(&self, key: &str) -> Result<Vec<Order>> {
        let members = self.store.range(key).await?;
        let orders = members
            .into_iter()
            .filter_map(|entry| match self.codec.decode(&entry.member) {
                Ok(order) => Some(order),
                Err(e) => {
                    warn!(key, score = entry.score, error = %e, "Skipping undecodable member");
                    None
                }
            })
            .collect();
        Ok(orders)
    }

    fn dispatch(&self, event: &OrderEvent) -> Result<()> {
        self.notifier
            .notify(&event.topic, &event.payload)
            .map_err(Error::notification)
    }

    fn dispatch_committed(&self, event: &OrderEvent) -> Result<()> {
        self.notifier
            .notify(&event.topic, &event.payload)
            .map_err(|source: NotifyError| {
                warn!(topic = %event.topic, error = %source, "Notification failed after commit");
                Error::Notification {
                    committed: true,
                    source,
                }
            })
    }

    fn settle<T>(op: &'static str, order: &Order, outcome: TxOutcome<T>) -> Result<T> {
        outcome.into_result().map_err(|cause| {
            warn!(
                op,
                order_id = order.id,
                retryable = cause.is_retryable(),
                error = %cause,
                "Transaction aborted"
            );
            cause
        })
    }
}
