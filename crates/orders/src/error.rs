use kiln_broker::BrokerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order {0} not found")]
    NotFound(u64),

    #[error("unknown order status: {0}")]
    UnknownStatus(String),

    #[error("invalid order: {0}")]
    Invalid(String),

    #[error("failed to publish order event: {0}")]
    Publish(#[from] BrokerError),

    #[error("failed to encode order event: {0}")]
    Encode(#[from] serde_json::Error),
}
