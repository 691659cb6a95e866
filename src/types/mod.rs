//! Domain types shared by the publisher, the store backends and notifiers.
//!
//! - [`order`] - Order and its lifecycle status
//! - [`event`] - Notification message sent to topic subscribers

pub mod event;
pub mod order;

pub use event::OrderEvent;
pub use order::{Order, OrderStatus};

/// Timestamp in milliseconds since Unix epoch
pub type TimestampMs = u64;

/// Score of an index member
///
/// Scores are publication timestamps, so an index reads back in the order
/// its members were published.
pub type Score = TimestampMs;
