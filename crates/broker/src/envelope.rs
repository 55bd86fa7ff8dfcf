use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Partition every envelope is assigned to. Topics are single-partition.
pub const DEFAULT_PARTITION: u32 = 0;

/// A message as stored in a topic log.
///
/// This is the unit appended to a topic and handed to consumers.
///
/// Notes:
/// - **Append-only**: `offset` is gapless and monotonically increasing per topic.
/// - `key` is carried for wire compatibility but never set by the broker.
/// - `value` is the opaque JSON payload supplied by the publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    topic: String,
    partition: u32,

    /// 0-based position in the topic log.
    offset: u64,

    timestamp: DateTime<Utc>,
    key: Option<Vec<u8>>,
    value: JsonValue,
}

impl Envelope {
    pub fn new(topic: impl Into<String>, offset: u64, value: JsonValue) -> Self {
        Self {
            topic: topic.into(),
            partition: DEFAULT_PARTITION,
            offset,
            timestamp: Utc::now(),
            key: None,
            value,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn partition(&self) -> u32 {
        self.partition
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn key(&self) -> Option<&[u8]> {
        self.key.as_deref()
    }

    pub fn value(&self) -> &JsonValue {
        &self.value
    }

    pub fn into_value(self) -> JsonValue {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_wire_field_names() {
        let env = Envelope::new("order-events", 7, serde_json::json!({"orderId": 1}));
        let json = serde_json::to_value(&env).unwrap();

        assert_eq!(json["topic"], "order-events");
        assert_eq!(json["partition"], 0);
        assert_eq!(json["offset"], 7);
        assert!(json["key"].is_null());
        assert_eq!(json["value"]["orderId"], 1);
        assert!(json["timestamp"].as_str().is_some());
    }
}
