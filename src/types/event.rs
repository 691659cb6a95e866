//! Notification message types.

use serde::{Deserialize, Serialize};

/// Notification pushed to the subscribers of a topic
///
/// `payload` is the serialized order exactly as the codec produced it, so a
/// subscriber can decode it with the same codec the publisher uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    /// Topic key the event is addressed to
    pub topic: String,
    /// Serialized order
    pub payload: String,
}

impl OrderEvent {
    /// Create a new event
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = OrderEvent::new("msk", "{\"id\":1}");
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"topic":"msk","payload":"{\"id\":1}"}"#);
    }
}
