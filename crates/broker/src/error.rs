use thiserror::Error;

/// Errors surfaced by the broker API.
///
/// Consumer-side failures are not part of this type: they are handled by
/// the retry controller and reported through `report`.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The broker was shut down; no further messages are accepted.
    #[error("broker is shut down")]
    Closed,

    /// A broker was constructed outside of a tokio runtime.
    #[error("no tokio runtime available to schedule deliveries")]
    NoRuntime,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Invalid broker configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}
