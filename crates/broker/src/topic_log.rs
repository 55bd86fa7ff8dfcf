//! Append-only topic logs plus the global message history.
//!
//! Each topic owns its own lock so appends to different topics do not
//! contend; the topic map itself is only write-locked when a topic is created.
//!
//! Lock order is always `topic -> history`. The history push happens while
//! the topic lock is held, which keeps the global history consistent with
//! per-topic offset order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde_json::Value as JsonValue;
use tracing::info;

use crate::envelope::Envelope;

type Partition = Arc<Mutex<Vec<Envelope>>>;

/// In-memory append-only log of every topic.
#[derive(Debug, Default)]
pub struct TopicLog {
    topics: RwLock<HashMap<String, Partition>>,
    history: Mutex<Vec<Envelope>>,
}

impl TopicLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the topic if it does not exist yet. Returns `true` if it was created.
    pub fn ensure_topic(&self, name: &str) -> bool {
        if self.read_topics().contains_key(name) {
            return false;
        }

        let mut topics = self.topics.write().unwrap_or_else(PoisonError::into_inner);
        if topics.contains_key(name) {
            return false;
        }
        topics.insert(name.to_string(), Partition::default());
        info!(topic = %name, "topic created");
        true
    }

    /// Append a payload to a topic, assigning the next offset.
    pub fn append(&self, name: &str, value: JsonValue) -> Envelope {
        let partition = self.partition(name);

        let mut entries = partition.lock().unwrap_or_else(PoisonError::into_inner);
        let envelope = Envelope::new(name, entries.len() as u64, value);
        entries.push(envelope.clone());

        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(envelope.clone());

        envelope
    }

    /// Snapshot of every envelope in a topic (empty for unknown topics).
    pub fn list(&self, name: &str) -> Vec<Envelope> {
        match self.read_topics().get(name) {
            Some(p) => p.lock().unwrap_or_else(PoisonError::into_inner).clone(),
            None => Vec::new(),
        }
    }

    /// Number of messages in a topic, which is also its next offset.
    pub fn len(&self, name: &str) -> usize {
        match self.read_topics().get(name) {
            Some(p) => p.lock().unwrap_or_else(PoisonError::into_inner).len(),
            None => 0,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read_topics().contains_key(name)
    }

    /// Snapshot of every envelope across all topics, in publish order.
    pub fn history(&self) -> Vec<Envelope> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Topic names, sorted.
    pub fn topic_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read_topics().keys().cloned().collect();
        names.sort();
        names
    }

    fn partition(&self, name: &str) -> Partition {
        if let Some(p) = self.read_topics().get(name) {
            return p.clone();
        }
        self.ensure_topic(name);
        self.read_topics()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    fn read_topics(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Partition>> {
        self.topics.read().unwrap_or_else(PoisonError::into_inner)
    }
}
