//! Order payload encoding.
//!
//! The payload written into an index is also the key used to remove it, so
//! a codec must be deterministic: equal orders encode to equal strings.

use crate::error::Error;
use crate::types::Order;

/// Converts an order to a stable payload and back
pub trait OrderCodec: Send + Sync {
    /// Encode an order
    ///
    /// # Errors
    ///
    /// Returns an error if the order cannot be represented.
    fn encode(&self, order: &Order) -> Result<String, Error>;

    /// Decode a payload previously produced by [`encode`](Self::encode)
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a valid order.
    fn decode(&self, payload: &str) -> Result<Order, Error>;
}

/// Compact JSON codec backed by `serde_json`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl OrderCodec for JsonCodec {
    fn encode(&self, order: &Order) -> Result<String, Error> {
        Ok(serde_json::to_string(order)?)
    }

    fn decode(&self, payload: &str) -> Result<Order, Error> {
        Ok(serde_json::from_str(payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderStatus;

    #[test]
    fn test_encoding_is_stable() {
        let a = Order::new(1, "ab-cd", "msk");
        let b = Order::new(1, "ab-cd", "msk");
        assert_eq!(JsonCodec.encode(&a).unwrap(), JsonCodec.encode(&b).unwrap());
    }

    #[test]
    fn test_exact_payload() {
        let payload = JsonCodec.encode(&Order::new(1, "ab-cd", "msk")).unwrap();
        assert_eq!(
            payload,
            r#"{"id":1,"userkod":"ab-cd","status":"NEW","region":"msk"}"#
        );
    }

    #[test]
    fn test_status_changes_payload() {
        let order = Order::new(1, "ab-cd", "msk");
        let rejected = order.with_status(OrderStatus::Rejected);
        assert_ne!(
            JsonCodec.encode(&order).unwrap(),
            JsonCodec.encode(&rejected).unwrap()
        );
    }

    #[test]
    fn test_decode_garbage() {
        let err = JsonCodec.decode("not json").unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
