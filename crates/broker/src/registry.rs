//! Consumer registrations keyed by (topic, group).

use std::fmt;
use std::sync::{PoisonError, RwLock};

use tracing::info;

use crate::handler::SharedHandler;

/// One consumer group subscribed to one topic.
#[derive(Clone)]
pub struct Registration {
    topic: String,
    group: String,
    handler: SharedHandler,
}

impl Registration {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn handler(&self) -> &SharedHandler {
        &self.handler
    }

    /// Inspection key, `"<topic>-<group>"`.
    pub fn key(&self) -> String {
        format!("{}-{}", self.topic, self.group)
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("topic", &self.topic)
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

/// Registry of consumer registrations, in registration order.
///
/// Read on every publish, written only on subscribe.
#[derive(Default)]
pub struct ConsumerRegistry {
    entries: RwLock<Vec<Registration>>,
}

impl ConsumerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or replace the handler for (topic, group).
    ///
    /// A replaced registration keeps its original position. Returns `true`
    /// when an existing handler was replaced.
    pub fn register(
        &self,
        topic: impl Into<String>,
        group: impl Into<String>,
        handler: SharedHandler,
    ) -> bool {
        let topic = topic.into();
        let group = group.into();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = entries
            .iter_mut()
            .find(|r| r.topic == topic && r.group == group)
        {
            existing.handler = handler;
            info!(topic = %topic, group = %group, "consumer handler replaced");
            return true;
        }

        info!(topic = %topic, group = %group, "consumer subscribed");
        entries.push(Registration {
            topic,
            group,
            handler,
        });
        false
    }

    /// Every registration for `topic`, in registration order.
    pub fn lookup_all(&self, topic: &str) -> Vec<Registration> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.topic == topic)
            .cloned()
            .collect()
    }

    pub fn all_keys(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(Registration::key)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ConsumerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerRegistry")
            .field("keys", &self.all_keys())
            .finish()
    }
}
