//! Wire payloads for the order flow.
//!
//! Field names are camelCase and event types SCREAMING_SNAKE_CASE, matching
//! what downstream consumers of these topics already parse.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::order::{Order, OrderStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEventType {
    OrderCreated,
    OrderStatusChanged,
    OrderDeleted,
}

impl OrderEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderEventType::OrderCreated => "ORDER_CREATED",
            OrderEventType::OrderStatusChanged => "ORDER_STATUS_CHANGED",
            OrderEventType::OrderDeleted => "ORDER_DELETED",
        }
    }

    /// Parse a wire event type; `None` for types this crate does not know.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ORDER_CREATED" => Some(OrderEventType::OrderCreated),
            "ORDER_STATUS_CHANGED" => Some(OrderEventType::OrderStatusChanged),
            "ORDER_DELETED" => Some(OrderEventType::OrderDeleted),
            _ => None,
        }
    }
}

impl fmt::Display for OrderEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message published to `order-events`.
///
/// Only `eventType` and `orderId` are required when reading; other producers
/// on this topic may leave the rest out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    pub order_id: u64,
    #[serde(default)]
    pub user_id: Option<u64>,
    pub event_type: OrderEventType,
    #[serde(default)]
    pub old_status: Option<OrderStatus>,
    #[serde(default)]
    pub new_status: Option<OrderStatus>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub total_amount: Option<f64>,
}

impl OrderEvent {
    pub fn created(order: &Order) -> Self {
        Self::for_order(order, OrderEventType::OrderCreated, None, Some(order.status))
    }

    pub fn status_changed(order: &Order, old_status: OrderStatus) -> Self {
        Self::for_order(
            order,
            OrderEventType::OrderStatusChanged,
            Some(old_status),
            Some(order.status),
        )
    }

    /// `order` is the order as it was right before deletion.
    pub fn deleted(order: &Order) -> Self {
        Self::for_order(order, OrderEventType::OrderDeleted, Some(order.status), None)
    }

    fn for_order(
        order: &Order,
        event_type: OrderEventType,
        old_status: Option<OrderStatus>,
        new_status: Option<OrderStatus>,
    ) -> Self {
        Self {
            order_id: order.id,
            user_id: Some(order.user_id),
            event_type,
            old_status,
            new_status,
            timestamp: Utc::now(),
            total_amount: Some(order.total_amount),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryEventType {
    StockReserved,
    StockReleased,
}

/// Message published to `inventory-events`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEvent {
    pub event_type: InventoryEventType,
    pub order_id: u64,
    pub timestamp: DateTime<Utc>,
}

impl InventoryEvent {
    pub fn new(event_type: InventoryEventType, order_id: u64) -> Self {
        Self {
            event_type,
            order_id,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationEventType {
    OrderConfirmationEmail,
    OrderDeliveredNotification,
}

/// Message published to `notification-events`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub event_type: NotificationEventType,
    pub user_id: u64,
    pub order_id: u64,
    pub timestamp: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(event_type: NotificationEventType, user_id: u64, order_id: u64) -> Self {
        Self {
            event_type,
            user_id,
            order_id,
            timestamp: Utc::now(),
        }
    }
}
