//! `kiln-broker`: in-process publish/subscribe broker.
//!
//! Topics are append-only logs with gapless per-topic offsets. Consumers
//! register per (topic, group); every publish fans out to each registration
//! as an independent, asynchronously scheduled delivery chain with linear
//! retry backoff and a dead-letter terminal state.

pub mod broker;
pub mod config;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod publisher;
pub mod registry;
pub mod report;
pub mod retry;
pub mod topic_log;

mod dispatcher;

pub use broker::{Broker, TopicInfo};
pub use config::BrokerConfig;
pub use envelope::Envelope;
pub use error::{BrokerError, ConfigError};
pub use handler::{HandlerResult, MessageHandler, SharedHandler};
pub use publisher::Publisher;
pub use registry::{ConsumerRegistry, Registration};
pub use report::{DeadLetterEntry, DeliveryOutcome, DeliveryStats};
pub use retry::{BackoffStrategy, DeliveryState, RetryPolicy};
pub use topic_log::TopicLog;
