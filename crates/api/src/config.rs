//! Process configuration for the API binary.

use std::net::SocketAddr;

use kiln_broker::{BrokerConfig, ConfigError};

pub const ENV_BIND: &str = "KILN_BIND";
pub const DEFAULT_BIND: &str = "0.0.0.0:8081";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind: SocketAddr,
    pub broker: BrokerConfig,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw = lookup(ENV_BIND).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = raw.parse::<SocketAddr>().map_err(|e| ConfigError::InvalidValue {
            key: ENV_BIND,
            value: raw.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            bind,
            broker: BrokerConfig::from_lookup(lookup)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_port_8081() {
        let config = ApiConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.bind.port(), 8081);
        assert_eq!(config.broker, BrokerConfig::default());
    }

    #[test]
    fn invalid_bind_is_reported_with_key() {
        let err = ApiConfig::from_lookup(|k| (k == ENV_BIND).then(|| "nope".to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: ENV_BIND, .. }));
    }
}
