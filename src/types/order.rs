//! Order-related types.

use serde::{Deserialize, Serialize};

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Freshly created by the customer
    New,
    /// Visible to workers and open for responses
    Active,
    /// A worker took the order
    Accepted,
    /// Work finished
    Completed,
    /// Withdrawn by the customer
    Rejected,
}

impl OrderStatus {
    /// Whether an order with this status belongs in the active indexes
    pub fn is_live(self) -> bool {
        matches!(
            self,
            OrderStatus::New | OrderStatus::Active | OrderStatus::Accepted
        )
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::New
    }
}

/// A customer's service request
///
/// Field declaration order is the serialization order, which keeps the JSON
/// payload byte-stable for a given state. Index entries are removed by exact
/// payload, so do not reorder fields without migrating stored indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Stable order identifier
    pub id: u64,

    /// Customer identifier (may contain hyphens)
    pub userkod: String,

    /// Lifecycle status
    #[serde(default)]
    pub status: OrderStatus,

    /// Region the order was placed in; resolved to a topic key
    pub region: String,

    /// Free-text description of the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Order {
    /// Create a new order with status `NEW`
    pub fn new(id: u64, userkod: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            id,
            userkod: userkod.into(),
            status: OrderStatus::New,
            region: region.into(),
            description: None,
        }
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Copy of this order with a different status
    #[must_use]
    pub fn with_status(&self, status: OrderStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_order_is_new() {
        let order = Order::new(1, "ab-cd", "msk");
        assert_eq!(order.status, OrderStatus::New);
        assert!(order.status.is_live());
        assert_eq!(order.description, None);
    }

    #[test]
    fn test_with_status_copies() {
        let order = Order::new(1, "ab-cd", "msk").with_description("fix the sink");
        let rejected = order.with_status(OrderStatus::Rejected);

        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(rejected.status, OrderStatus::Rejected);
        assert_eq!(rejected.description.as_deref(), Some("fix the sink"));
        assert!(!rejected.status.is_live());
    }

    #[test]
    fn test_serde_status() {
        let json = serde_json::to_string(&OrderStatus::Rejected).unwrap();
        assert_eq!(json, "\"REJECTED\"");

        let status: OrderStatus = serde_json::from_str("\"NEW\"").unwrap();
        assert_eq!(status, OrderStatus::New);
    }

    #[test]
    fn test_missing_status_defaults_to_new() {
        let order: Order =
            serde_json::from_str(r#"{"id":7,"userkod":"x","region":"spb"}"#).unwrap();
        assert_eq!(order.status, OrderStatus::New);
    }
}
