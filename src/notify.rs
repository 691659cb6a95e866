//! Notification of topic subscribers.
//!
//! The publisher calls a [`Notifier`] once per publish or retract and does
//! not wait for delivery. [`BroadcastNotifier`] fans events out to every
//! in-process subscriber over a `tokio::sync::broadcast` channel; a network
//! transport (websocket, pub/sub) can sit behind the same trait.
//!
//! # Example
//!
//! ```rust
//! use order_broadcast::notify::{BroadcastNotifier, Notifier};
//!
//! # tokio_test::block_on(async {
//! let notifier = BroadcastNotifier::new(16);
//! let mut msk = notifier.subscribe_topic("msk");
//!
//! notifier.notify("spb", "{}").unwrap();
//! notifier.notify("msk", "{\"id\":1}").unwrap();
//!
//! let event = msk.recv().await.unwrap();
//! assert_eq!(event.payload, "{\"id\":1}");
//! # });
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{trace, warn};

use crate::error::NotifyError;
use crate::types::OrderEvent;

/// Delivers a topic key and payload to subscribers
pub trait Notifier: Send + Sync {
    /// Push `payload` to the subscribers of `topic`
    ///
    /// # Errors
    ///
    /// Returns an error if the message could not be handed to the transport.
    fn notify(&self, topic: &str, payload: &str) -> Result<(), NotifyError>;
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify(&self, topic: &str, payload: &str) -> Result<(), NotifyError> {
        (**self).notify(topic, payload)
    }
}

/// In-process fan-out notifier
///
/// Having no subscribers is not an error: the event is simply dropped.
/// Subscribers that fall more than `capacity` events behind skip the
/// oldest ones.
#[derive(Debug)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<OrderEvent>,
    closed: AtomicBool,
}

impl BroadcastNotifier {
    /// Create a notifier buffering up to `capacity` events per subscriber
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            closed: AtomicBool::new(false),
        }
    }

    /// Receive every event
    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.sender.subscribe()
    }

    /// Receive events for one topic
    pub fn subscribe_topic(&self, topic: impl Into<String>) -> TopicSubscription {
        TopicSubscription {
            topic: topic.into(),
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Refuse further notifications
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Check if [`shutdown`](Self::shutdown) was called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, topic: &str, payload: &str) -> Result<(), NotifyError> {
        if self.is_closed() {
            return Err(NotifyError::Closed);
        }
        match self.sender.send(OrderEvent::new(topic, payload)) {
            Ok(receivers) => trace!(topic, receivers, "Event broadcast"),
            Err(_) => trace!(topic, "No subscribers"),
        }
        Ok(())
    }
}

/// Receiver filtered to a single topic
#[derive(Debug)]
pub struct TopicSubscription {
    topic: String,
    receiver: broadcast::Receiver<OrderEvent>,
}

impl TopicSubscription {
    /// Topic this subscription follows
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for the next event on this topic
    ///
    /// Returns `None` once the notifier is dropped.
    pub async fn recv(&mut self) -> Option<OrderEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.topic == self.topic => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "Subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next already-buffered event on this topic, without waiting
    pub fn try_recv(&mut self) -> Option<OrderEvent> {
        use broadcast::error::TryRecvError;

        loop {
            match self.receiver.try_recv() {
                Ok(event) if event.topic == self.topic => return Some(event),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "Subscriber lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subscribers_is_ok() {
        let notifier = BroadcastNotifier::new(4);
        assert_eq!(notifier.subscriber_count(), 0);
        assert!(notifier.notify("msk", "{}").is_ok());
    }

    #[test]
    fn test_topic_filter() {
        let notifier = BroadcastNotifier::new(8);
        let mut msk = notifier.subscribe_topic("msk");
        let mut all = notifier.subscribe();

        notifier.notify("spb", "a").unwrap();
        notifier.notify("msk", "b").unwrap();

        assert_eq!(msk.topic(), "msk");
        assert_eq!(msk.try_recv(), Some(OrderEvent::new("msk", "b")));
        assert_eq!(msk.try_recv(), None);
        assert_eq!(all.try_recv().unwrap().topic, "spb");
    }

    #[test]
    fn test_shutdown_rejects() {
        let notifier = BroadcastNotifier::default();
        notifier.shutdown();
        assert!(notifier.is_closed());
        assert_eq!(notifier.notify("msk", "{}"), Err(NotifyError::Closed));
    }

    #[test]
    fn test_lagged_subscriber_recovers() {
        let notifier = BroadcastNotifier::new(2);
        let mut msk = notifier.subscribe_topic("msk");

        for i in 0..5 {
            notifier.notify("msk", &i.to_string()).unwrap();
        }

        assert_eq!(msk.try_recv().unwrap().payload, "3");
        assert_eq!(msk.try_recv().unwrap().payload, "4");
    }

    #[tokio::test]
    async fn test_recv_ends_when_dropped() {
        let notifier = BroadcastNotifier::new(2);
        let mut msk = notifier.subscribe_topic("msk");
        drop(notifier);
        assert_eq!(msk.recv().await, None);
    }

    #[test]
    fn test_arc_forwarding() {
        let notifier = Arc::new(BroadcastNotifier::new(2));
        let mut sub = notifier.subscribe_topic("t");
        Notifier::notify(&notifier, "t", "x").unwrap();
        assert!(sub.try_recv().is_some());
    }
}
