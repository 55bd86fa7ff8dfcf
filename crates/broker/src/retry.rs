//! Retry policy and the per-chain delivery state machine.
//!
//! A delivery chain is one (envelope, registration) pair. Attempt `0` is the
//! initial delivery; attempts `1..=max_retries` are retries. The default
//! schedule is linear (`base_delay * n`), which is what the broker has always
//! done even though older docs called it "exponential backoff".

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Backoff strategy for retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed,
    /// Linear backoff: base * retry
    #[default]
    Linear,
    /// Exponential backoff: base * 2^(retry - 1)
    Exponential,
}

/// Retry policy applied to every delivery chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the initial delivery (0 = no retries)
    pub max_retries: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
    /// Backoff strategy
    pub strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(3600),
            strategy: BackoffStrategy::Linear,
        }
    }
}

impl RetryPolicy {
    /// A policy that dead-letters on the first failure.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    pub fn linear(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            ..Default::default()
        }
    }

    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay: delay,
            max_delay: delay,
            strategy: BackoffStrategy::Fixed,
        }
    }

    pub fn exponential(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
            strategy: BackoffStrategy::Exponential,
        }
    }

    /// Delay before retry `retry` (1-indexed). Retry 0 is the initial delivery.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let delay = match self.strategy {
            BackoffStrategy::Fixed => self.base_delay,
            BackoffStrategy::Linear => self.base_delay.saturating_mul(retry),
            BackoffStrategy::Exponential => {
                let exp = (retry - 1).min(31);
                self.base_delay.saturating_mul(1_u32 << exp)
            }
        };

        delay.min(self.max_delay)
    }

    /// Whether a failure at `attempt` earns another retry.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// State of one delivery chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeliveryState {
    /// Waiting for the delay before `attempt`
    Scheduled { attempt: u32 },
    /// Handler is being invoked for `attempt`
    Running { attempt: u32 },
    /// Handler succeeded; `attempts` counts every invocation
    Succeeded { attempts: u32 },
    /// Retries exhausted; the envelope is dropped for this registration
    DeadLettered { attempts: u32, error: String },
}

impl DeliveryState {
    pub fn initial() -> Self {
        Self::Scheduled { attempt: 0 }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeliveryState::Succeeded { .. } | DeliveryState::DeadLettered { .. }
        )
    }

    /// `Scheduled(n) -> Running(n)`. Other states are returned unchanged.
    pub fn start(self) -> Self {
        match self {
            DeliveryState::Scheduled { attempt } => DeliveryState::Running { attempt },
            other => other,
        }
    }

    /// Transition out of `Running(n)` given the handler outcome.
    ///
    /// Other states are returned unchanged.
    pub fn complete(self, outcome: Result<(), String>, policy: &RetryPolicy) -> Self {
        let DeliveryState::Running { attempt } = self else {
            return self;
        };

        match outcome {
            Ok(()) => DeliveryState::Succeeded {
                attempts: attempt + 1,
            },
            Err(_) if policy.should_retry(attempt) => DeliveryState::Scheduled {
                attempt: attempt + 1,
            },
            Err(error) => DeliveryState::DeadLettered {
                attempts: attempt + 1,
                error,
            },
        }
    }
}
