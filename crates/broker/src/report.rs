//! Delivery reporting: counters, dead-letter records and terminal outcomes.
//!
//! Consumer-side failures never reach publishers. This module is the only
//! place they become observable: a `warn` log line per failed attempt, a
//! `DeliveryOutcome` broadcast per finished chain, and an in-memory record of
//! every dead-lettered envelope.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::envelope::Envelope;
use crate::retry::DeliveryState;

/// Terminal result of one delivery chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub topic: String,
    pub group: String,
    pub offset: u64,
    pub state: DeliveryState,
}

impl DeliveryOutcome {
    pub fn is_dead_lettered(&self) -> bool {
        matches!(self.state, DeliveryState::DeadLettered { .. })
    }
}

/// Broker-wide delivery counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStats {
    /// Delivery chains started (one per matching registration per publish)
    pub chains_started: u64,
    /// Handler invocations, initial and retries
    pub attempts: u64,
    /// Failed invocations that were rescheduled
    pub retries: u64,
    pub succeeded: u64,
    pub dead_lettered: u64,
    /// Chains currently scheduled or running
    pub in_flight: u64,
}

/// An envelope that exhausted its retries for one consumer group.
///
/// Kept for inspection only; it is not re-published anywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterEntry {
    pub envelope: Envelope,
    pub group: String,
    pub attempts: u32,
    pub error: String,
    pub dead_lettered_at: DateTime<Utc>,
}

#[derive(Debug)]
pub(crate) struct DeliveryReporter {
    stats: Mutex<DeliveryStats>,
    dead_letters: Mutex<Vec<DeadLetterEntry>>,
    outcomes: broadcast::Sender<DeliveryOutcome>,
}

impl DeliveryReporter {
    pub(crate) fn new(outcome_capacity: usize) -> Self {
        let (outcomes, _) = broadcast::channel(outcome_capacity.max(1));
        Self {
            stats: Mutex::new(DeliveryStats::default()),
            dead_letters: Mutex::new(Vec::new()),
            outcomes,
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<DeliveryOutcome> {
        self.outcomes.subscribe()
    }

    pub(crate) fn stats(&self) -> DeliveryStats {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn dead_letters(&self) -> Vec<DeadLetterEntry> {
        self.dead_letters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn chain_started(&self) {
        let mut s = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        s.chains_started += 1;
        s.in_flight += 1;
    }

    pub(crate) fn attempt_started(&self) {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner).attempts += 1;
    }

    pub(crate) fn attempt_failed(&self, envelope: &Envelope, group: &str, next: &DeliveryState, error: &str) {
        match next {
            DeliveryState::Scheduled { attempt } => {
                self.stats.lock().unwrap_or_else(PoisonError::into_inner).retries += 1;
                warn!(
                    topic = %envelope.topic(),
                    group = %group,
                    offset = envelope.offset(),
                    next_attempt = attempt,
                    error = %error,
                    "delivery attempt failed, retry scheduled"
                );
            }
            _ => {
                warn!(
                    topic = %envelope.topic(),
                    group = %group,
                    offset = envelope.offset(),
                    error = %error,
                    "delivery attempt failed"
                );
            }
        }
    }

    /// Record a terminal chain state and broadcast it.
    pub(crate) fn finish(&self, envelope: &Envelope, group: &str, state: DeliveryState) {
        {
            let mut s = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
            s.in_flight = s.in_flight.saturating_sub(1);
            match &state {
                DeliveryState::Succeeded { .. } => s.succeeded += 1,
                DeliveryState::DeadLettered { .. } => s.dead_lettered += 1,
                _ => {}
            }
        }

        match &state {
            DeliveryState::Succeeded { attempts } => {
                debug!(
                    topic = %envelope.topic(),
                    group = %group,
                    offset = envelope.offset(),
                    attempts = attempts,
                    "message delivered"
                );
            }
            DeliveryState::DeadLettered { attempts, error } => {
                warn!(
                    topic = %envelope.topic(),
                    group = %group,
                    offset = envelope.offset(),
                    attempts = attempts,
                    error = %error,
                    "retries exhausted, message dead-lettered"
                );
                self.dead_letters
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(DeadLetterEntry {
                        envelope: envelope.clone(),
                        group: group.to_string(),
                        attempts: *attempts,
                        error: error.clone(),
                        dead_lettered_at: Utc::now(),
                    });
            }
            _ => {}
        }

        // Lossy: nobody listening is fine.
        let _ = self.outcomes.send(DeliveryOutcome {
            topic: envelope.topic().to_string(),
            group: group.to_string(),
            offset: envelope.offset(),
            state,
        });
    }
}
