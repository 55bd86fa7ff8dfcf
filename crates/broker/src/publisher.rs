use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::envelope::Envelope;
use crate::error::BrokerError;

/// Publishing side of the broker, as seen by producers.
///
/// Producers depend on this trait rather than on `Broker` so they can be
/// exercised against a recording publisher in tests.
///
/// `publish` returns once the payload is appended to the topic log; fan-out
/// to consumers happens afterwards and its failures are never reported back
/// to the publisher.
pub trait Publisher: Send + Sync {
    fn publish(&self, topic: &str, payload: JsonValue) -> Result<Envelope, BrokerError>;
}

impl<P> Publisher for Arc<P>
where
    P: Publisher + ?Sized,
{
    fn publish(&self, topic: &str, payload: JsonValue) -> Result<Envelope, BrokerError> {
        (**self).publish(topic, payload)
    }
}
