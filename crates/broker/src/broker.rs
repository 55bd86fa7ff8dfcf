//! The broker: topic log + consumer registry + delivery dispatcher.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::config::BrokerConfig;
use crate::dispatcher::Dispatcher;
use crate::envelope::Envelope;
use crate::error::BrokerError;
use crate::handler::{MessageHandler, SharedHandler};
use crate::publisher::Publisher;
use crate::registry::ConsumerRegistry;
use crate::report::{DeadLetterEntry, DeliveryOutcome, DeliveryReporter, DeliveryStats};
use crate::topic_log::TopicLog;

/// Inspection view of one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicInfo {
    pub topic: String,
    pub message_count: usize,
    pub messages: Vec<Envelope>,
}

/// In-process publish/subscribe broker.
///
/// `Broker` is a cheap handle: clone it into producers, handlers and the
/// HTTP layer. All clones share the same topics, registrations and
/// in-flight deliveries.
///
/// ## Delivery guarantees
///
/// - **At-least-once per registration**: each (topic, group) registration
///   gets its own delivery chain per message, retried on failure until it
///   succeeds or is dead-lettered.
/// - **No cross-registration coupling**: one group failing never delays or
///   affects another group's delivery of the same message.
/// - **No per-group ordering guarantee**: a message that is mid-retry can be
///   overtaken by later messages on the same registration.
/// - **Fire-and-forget publishing**: `publish` returns after the append;
///   consumer failures are never reported to the publisher.
#[derive(Clone)]
pub struct Broker {
    inner: Arc<Inner>,
}

struct Inner {
    config: BrokerConfig,
    log: TopicLog,
    registry: ConsumerRegistry,
    reporter: Arc<DeliveryReporter>,
    dispatcher: Dispatcher,
    closed: AtomicBool,
}

impl Broker {
    /// Create a broker that schedules deliveries on the current tokio runtime.
    pub fn new(config: BrokerConfig) -> Result<Self, BrokerError> {
        let runtime = Handle::try_current().map_err(|_| BrokerError::NoRuntime)?;
        Ok(Self::with_runtime(config, runtime))
    }

    /// Create a broker that schedules deliveries on `runtime`.
    ///
    /// Publishing then works from any thread, inside or outside the runtime.
    pub fn with_runtime(config: BrokerConfig, runtime: Handle) -> Self {
        let reporter = Arc::new(DeliveryReporter::new(config.outcome_capacity));
        let dispatcher = Dispatcher::new(
            runtime,
            config.delivery_delay,
            config.retry.clone(),
            reporter.clone(),
        );

        Self {
            inner: Arc::new(Inner {
                config,
                log: TopicLog::new(),
                registry: ConsumerRegistry::new(),
                reporter,
                dispatcher,
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.inner.config
    }

    /// Create a topic ahead of its first publish/subscribe.
    pub fn ensure_topic(&self, topic: &str) {
        self.inner.log.ensure_topic(topic);
    }

    /// Append `payload` to `topic` and schedule delivery to its consumers.
    pub fn publish(&self, topic: &str, payload: JsonValue) -> Result<Envelope, BrokerError> {
        // Taken before the closed check: once `shutdown` has flipped the flag,
        // its drain waits for every publish that got past the check.
        let _hold = self.inner.dispatcher.hold();
        if self.is_closed() {
            return Err(BrokerError::Closed);
        }

        let envelope = self.inner.log.append(topic, payload);
        info!(
            topic = %envelope.topic(),
            partition = envelope.partition(),
            offset = envelope.offset(),
            "message published"
        );
        debug!(topic = %envelope.topic(), payload = %envelope.value(), "published payload");

        let registrations = self.inner.registry.lookup_all(topic);
        self.inner.dispatcher.on_publish(&envelope, registrations);

        Ok(envelope)
    }

    /// Register `handler` for (topic, group), replacing any previous handler.
    ///
    /// Only messages published after this call are delivered to it.
    pub fn subscribe<H>(&self, topic: &str, group: &str, handler: H)
    where
        H: MessageHandler,
    {
        self.subscribe_shared(topic, group, Arc::new(handler));
    }

    pub fn subscribe_shared(&self, topic: &str, group: &str, handler: SharedHandler) {
        self.inner.log.ensure_topic(topic);
        self.inner.registry.register(topic, group, handler);
    }

    pub fn topic_info(&self, topic: &str) -> TopicInfo {
        let messages = self.inner.log.list(topic);
        TopicInfo {
            topic: topic.to_string(),
            message_count: messages.len(),
            messages,
        }
    }

    /// Topic names, sorted.
    pub fn topics(&self) -> Vec<String> {
        self.inner.log.topic_names()
    }

    /// Every envelope across all topics, in publish order.
    pub fn all_messages(&self) -> Vec<Envelope> {
        self.inner.log.history()
    }

    pub fn total_messages(&self) -> usize {
        self.inner.log.history_len()
    }

    /// `"<topic>-<group>"` keys of every registration.
    pub fn consumer_keys(&self) -> Vec<String> {
        self.inner.registry.all_keys()
    }

    pub fn stats(&self) -> DeliveryStats {
        self.inner.reporter.stats()
    }

    /// Envelopes that exhausted their retries, per consumer group.
    pub fn dead_letters(&self) -> Vec<DeadLetterEntry> {
        self.inner.reporter.dead_letters()
    }

    /// Stream of terminal delivery outcomes (lossy when the receiver lags).
    pub fn outcomes(&self) -> broadcast::Receiver<DeliveryOutcome> {
        self.inner.reporter.subscribe()
    }

    /// Wait until no delivery chain is scheduled or running.
    ///
    /// Chains started by handlers publishing derived events are included.
    pub async fn drain(&self) {
        self.inner.dispatcher.in_flight().wait_idle().await;
    }

    /// Stop accepting publishes, then wait for in-flight deliveries.
    ///
    /// Handlers that publish while the broker drains get `BrokerError::Closed`
    /// and go through their normal retry path.
    pub async fn shutdown(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            info!("broker shutting down");
        }
        self.drain().await;
        info!("broker stopped");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl Publisher for Broker {
    fn publish(&self, topic: &str, payload: JsonValue) -> Result<Envelope, BrokerError> {
        Broker::publish(self, topic, payload)
    }
}

impl fmt::Debug for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broker")
            .field("topics", &self.topics())
            .field("consumers", &self.consumer_keys())
            .field("total_messages", &self.total_messages())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_outside_runtime_fails() {
        let err = Broker::new(BrokerConfig::default()).unwrap_err();
        assert!(matches!(err, BrokerError::NoRuntime));
    }

    #[tokio::test]
    async fn subscribe_creates_topic_and_records_key() {
        let broker = Broker::new(BrokerConfig::default()).unwrap();
        broker.subscribe("orders", "billing", |_: &Envelope| -> crate::HandlerResult { Ok(()) });

        assert_eq!(broker.topics(), vec!["orders".to_string()]);
        assert_eq!(broker.consumer_keys(), vec!["orders-billing".to_string()]);
        assert_eq!(broker.topic_info("orders").message_count, 0);
    }

    #[tokio::test]
    async fn topic_info_is_idempotent_and_serializes_camel_case() {
        let broker = Broker::new(BrokerConfig::default()).unwrap();
        broker.publish("orders", serde_json::json!({"id": 1})).unwrap();

        let first = broker.topic_info("orders");
        let second = broker.topic_info("orders");
        assert_eq!(first, second);

        let json = serde_json::to_value(&first).unwrap();
        assert_eq!(json["topic"], "orders");
        assert_eq!(json["messageCount"], 1);
        assert_eq!(json["messages"][0]["offset"], 0);
    }

    #[tokio::test]
    async fn unknown_topic_info_is_empty() {
        let broker = Broker::new(BrokerConfig::default()).unwrap();
        let info = broker.topic_info("nope");

        assert_eq!(info.message_count, 0);
        assert!(info.messages.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn shutdown_waits_for_every_accepted_publish() {
        use std::sync::atomic::AtomicUsize;

        let broker = Broker::new(
            BrokerConfig::default().with_delivery_delay(std::time::Duration::ZERO),
        )
        .unwrap();
        let delivered = Arc::new(AtomicUsize::new(0));
        let d = delivered.clone();
        broker.subscribe("orders", "billing", move |_: &Envelope| -> crate::HandlerResult {
            d.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let publishers: Vec<_> = (0..4)
            .map(|_| {
                let broker = broker.clone();
                std::thread::spawn(move || {
                    let mut accepted = 0;
                    for _ in 0..20_000 {
                        if broker.publish("orders", serde_json::json!({})).is_err() {
                            break;
                        }
                        accepted += 1;
                    }
                    accepted
                })
            })
            .collect();

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        broker.shutdown().await;
        let delivered_at_shutdown = delivered.load(Ordering::SeqCst);

        let accepted: usize = publishers.into_iter().map(|p| p.join().unwrap()).sum();
        assert!(accepted > 0);
        assert_eq!(delivered_at_shutdown, accepted);
        assert_eq!(broker.stats().in_flight, 0);
        assert_eq!(broker.total_messages(), accepted);
    }

    #[tokio::test]
    async fn publish_after_shutdown_is_rejected() {
        let broker = Broker::new(BrokerConfig::default()).unwrap();
        broker.shutdown().await;

        assert!(broker.is_closed());
        assert!(matches!(
            broker.publish("orders", serde_json::json!({})),
            Err(BrokerError::Closed)
        ));
        assert_eq!(broker.total_messages(), 0);
    }
}
