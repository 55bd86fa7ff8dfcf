//! Broker configuration.

use std::time::Duration;

use crate::error::ConfigError;
use crate::retry::RetryPolicy;

pub const ENV_DELIVERY_DELAY_MS: &str = "KILN_DELIVERY_DELAY_MS";
pub const ENV_RETRY_BASE_MS: &str = "KILN_RETRY_BASE_MS";
pub const ENV_MAX_RETRIES: &str = "KILN_MAX_RETRIES";

/// Broker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Delay before the first delivery attempt of every chain
    pub delivery_delay: Duration,
    /// Retry policy applied after a failed attempt
    pub retry: RetryPolicy,
    /// Capacity of the delivery-outcome broadcast channel
    pub outcome_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            delivery_delay: Duration::from_millis(100),
            retry: RetryPolicy::default(),
            outcome_capacity: 1024,
        }
    }
}

impl BrokerConfig {
    pub fn with_delivery_delay(mut self, delay: Duration) -> Self {
        self.delivery_delay = delay;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn with_outcome_capacity(mut self, capacity: usize) -> Self {
        self.outcome_capacity = capacity;
        self
    }

    /// Defaults overridden by `KILN_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the `KILN_*` keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(ms) = parse_u64(&lookup, ENV_DELIVERY_DELAY_MS)? {
            config.delivery_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_u64(&lookup, ENV_RETRY_BASE_MS)? {
            config.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(n) = parse_u64(&lookup, ENV_MAX_RETRIES)? {
            config.retry.max_retries =
                u32::try_from(n).map_err(|e| ConfigError::InvalidValue {
                    key: ENV_MAX_RETRIES,
                    value: n.to_string(),
                    reason: e.to_string(),
                })?;
        }

        Ok(config)
    }
}

fn parse_u64(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|e| ConfigError::InvalidValue {
            key,
            value: raw,
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_broker_schedule() {
        let config = BrokerConfig::default();
        assert_eq!(config.delivery_delay, Duration::from_millis(100));
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.base_delay, Duration::from_millis(1000));
    }

    #[test]
    fn lookup_overrides_defaults() {
        let config = BrokerConfig::from_lookup(lookup(&[
            (ENV_DELIVERY_DELAY_MS, "5"),
            (ENV_RETRY_BASE_MS, "20"),
            (ENV_MAX_RETRIES, " 1 "),
        ]))
        .unwrap();

        assert_eq!(config.delivery_delay, Duration::from_millis(5));
        assert_eq!(config.retry.base_delay, Duration::from_millis(20));
        assert_eq!(config.retry.max_retries, 1);
    }

    #[test]
    fn unparsable_value_is_rejected() {
        let err = BrokerConfig::from_lookup(lookup(&[(ENV_MAX_RETRIES, "many")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { key: ENV_MAX_RETRIES, .. }
        ));
    }
}
