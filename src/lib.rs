//! # order-broadcast
//!
//! Atomic publication of service orders into two time-ordered indexes, with
//! a notification to the workers of the order's region.
//!
//! ## Features
//!
//! - **Dual-index writes** - Customer index and topic index change together or not at all
//! - **Scoped transactions** - Abort on any failure, commit only on clean completion
//! - **Typed failures** - Callers can tell a transient store error from a bad payload
//! - **Pluggable backends** - In-memory store, Redis `MULTI/EXEC` behind the `redis` feature
//!
//! ## Quick Start
//!
//! ```rust
//! use order_broadcast::notify::BroadcastNotifier;
//! use order_broadcast::store::InMemoryStore;
//! use order_broadcast::types::Order;
//! use order_broadcast::OrderPublisher;
//!
//! # tokio_test::block_on(async {
//! let notifier = BroadcastNotifier::default();
//! let mut workers = notifier.subscribe_topic("msk");
//! let publisher = OrderPublisher::new(InMemoryStore::new(), notifier);
//!
//! let order = Order::new(1, "ab-cd", "msk");
//! publisher.publish(&order).await?;
//!
//! let event = workers.recv().await.unwrap();
//! assert_eq!(event.topic, "msk");
//! # Ok::<(), order_broadcast::Error>(())
//! # }).unwrap();
//! ```
//!
//! ## Architecture
//!
//! - [`publisher`] - The publish/retract protocol
//! - [`store`] - Ordered-set storage and scoped transactions
//! - [`keys`] - Customer key derivation and topic resolution
//! - [`codec`] - Deterministic order payloads
//! - [`notify`] - Subscriber notification
//! - [`config`] - Configuration
//! - [`error`] - Error types for the crate

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod keys;
pub mod notify;
pub mod publisher;
pub mod store;
pub mod types;

// Re-export main types at crate root for convenience
pub use config::Config;
pub use error::{Error, PublishError};
pub use publisher::OrderPublisher;

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;
