use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use kiln_broker::{DeliveryStats, TopicInfo};
use kiln_orders::Order;
use serde::{Deserialize, Serialize};

pub const CODE_OK: &str = "0000";
pub const CODE_BAD_REQUEST: &str = "1001";
pub const CODE_ORDER_NOT_FOUND: &str = "4001";
pub const CODE_NOT_FOUND: &str = "404";
pub const CODE_INTERNAL: &str = "9999";

// -------------------------
// Response envelope
// -------------------------

/// `{code, message, data, timestamp}` wrapper used by every `/api` route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: String,
    pub message: String,
    pub data: Option<T>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::new(CODE_OK, message, Some(data))
    }

    pub fn new(code: &str, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            data,
            timestamp: Utc::now(),
        }
    }
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPage {
    pub content: Vec<Order>,
    pub total_elements: usize,
}

impl From<Vec<Order>> for OrderPage {
    fn from(content: Vec<Order>) -> Self {
        Self {
            total_elements: content.len(),
            content,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerStatus {
    pub topics: BTreeMap<String, TopicInfo>,
    pub total_messages: usize,
    pub consumers: Vec<String>,
    pub stats: DeliveryStats,
}

#[derive(Debug, Serialize)]
pub struct HealthView {
    pub status: &'static str,
    pub components: BTreeMap<&'static str, BrokerHealth>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerHealth {
    pub status: &'static str,
    pub topics: Vec<String>,
    pub total_messages: usize,
}
