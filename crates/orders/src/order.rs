//! Minimal in-memory order store.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OrderError;

/// Order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Next step of the fulfilment path; `None` once delivered or cancelled.
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Processing),
            OrderStatus::Processing => Some(OrderStatus::Shipped),
            OrderStatus::Shipped => Some(OrderStatus::Delivered),
            OrderStatus::Delivered | OrderStatus::Cancelled => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(OrderStatus::Pending),
            "PROCESSING" => Ok(OrderStatus::Processing),
            "SHIPPED" => Ok(OrderStatus::Shipped),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            _ => Err(OrderError::UnknownStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: u64,
    pub quantity: u32,
    pub price: f64,
}

/// Input for [`OrderBook::create`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub user_id: u64,
    pub total_amount: f64,
    #[serde(default)]
    pub order_items: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: u64,
    pub user_id: u64,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub order_items: Vec<OrderItem>,
}

#[derive(Debug, Default)]
struct Book {
    next_id: u64,
    orders: BTreeMap<u64, Order>,
}

/// Orders keyed by id. Ids start at 1 and are never reused.
#[derive(Debug, Default)]
pub struct OrderBook {
    inner: Mutex<Book>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new `PENDING` order.
    pub fn create(&self, new: NewOrder) -> Result<Order, OrderError> {
        if !new.total_amount.is_finite() || new.total_amount < 0.0 {
            return Err(OrderError::Invalid(format!(
                "totalAmount must be a non-negative number, got {}",
                new.total_amount
            )));
        }

        let mut book = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        book.next_id += 1;
        let order = Order {
            id: book.next_id,
            user_id: new.user_id,
            total_amount: new.total_amount,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            updated_at: None,
            order_items: new.order_items,
        };
        book.orders.insert(order.id, order.clone());
        Ok(order)
    }

    /// Set the status of order `id`; returns the updated order and its previous status.
    pub fn update_status(&self, id: u64, status: OrderStatus) -> Result<(Order, OrderStatus), OrderError> {
        let mut book = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let order = book.orders.get_mut(&id).ok_or(OrderError::NotFound(id))?;

        let old = order.status;
        order.status = status;
        order.updated_at = Some(Utc::now());
        Ok((order.clone(), old))
    }

    /// Remove order `id`, returning it as it was.
    pub fn delete(&self, id: u64) -> Result<Order, OrderError> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .orders
            .remove(&id)
            .ok_or(OrderError::NotFound(id))
    }

    /// Put `order` back under its id, replacing whatever is stored there.
    ///
    /// Used to undo a change whose event could not be published. The id
    /// counter is left alone, so a rolled-back create still burns its id.
    pub fn restore(&self, order: Order) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .orders
            .insert(order.id, order);
    }

    pub fn get(&self, id: u64) -> Option<Order> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .orders
            .get(&id)
            .cloned()
    }

    /// All orders, by id.
    pub fn list(&self) -> Vec<Order> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .orders
            .values()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_order(user_id: u64) -> NewOrder {
        NewOrder {
            user_id,
            total_amount: 199.0,
            order_items: vec![OrderItem {
                product_id: 2,
                quantity: 1,
                price: 199.0,
            }],
        }
    }

    #[test]
    fn create_assigns_increasing_ids_and_pending_status() {
        let book = OrderBook::new();
        let a = book.create(new_order(1)).unwrap();
        let b = book.create(new_order(2)).unwrap();

        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(a.status, OrderStatus::Pending);
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let book = OrderBook::new();
        let a = book.create(new_order(1)).unwrap();
        book.delete(a.id).unwrap();
        let b = book.create(new_order(1)).unwrap();

        assert_eq!(b.id, 2);
        assert!(book.get(a.id).is_none());
    }

    #[test]
    fn update_status_returns_previous_status() {
        let book = OrderBook::new();
        let order = book.create(new_order(1)).unwrap();

        let (updated, old) = book.update_status(order.id, OrderStatus::Shipped).unwrap();
        assert_eq!(old, OrderStatus::Pending);
        assert_eq!(updated.status, OrderStatus::Shipped);
        assert!(updated.updated_at.is_some());
    }

    #[test]
    fn restore_puts_back_the_previous_version() {
        let book = OrderBook::new();
        let before = book.create(new_order(1)).unwrap();
        book.update_status(before.id, OrderStatus::Shipped).unwrap();

        book.restore(before.clone());
        assert_eq!(book.get(before.id), Some(before.clone()));

        book.delete(before.id).unwrap();
        book.restore(before.clone());
        assert_eq!(book.len(), 1);
        assert_eq!(book.create(new_order(1)).unwrap().id, 2);
    }

    #[test]
    fn missing_order_is_not_found() {
        let book = OrderBook::new();
        assert!(matches!(
            book.update_status(9, OrderStatus::Delivered),
            Err(OrderError::NotFound(9))
        ));
        assert!(matches!(book.delete(9), Err(OrderError::NotFound(9))));
    }

    #[test]
    fn negative_amount_is_rejected() {
        let book = OrderBook::new();
        let mut bad = new_order(1);
        bad.total_amount = -1.0;

        assert!(matches!(book.create(bad), Err(OrderError::Invalid(_))));
        assert!(book.is_empty());
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("delivered".parse::<OrderStatus>().unwrap(), OrderStatus::Delivered);
        assert_eq!("CANCELLED".parse::<OrderStatus>().unwrap(), OrderStatus::Cancelled);
        assert!(matches!(
            "LOST".parse::<OrderStatus>(),
            Err(OrderError::UnknownStatus(s)) if s == "LOST"
        ));
    }

    #[test]
    fn fulfilment_path_ends_at_delivered() {
        let mut path = vec![OrderStatus::Pending];
        while let Some(next) = path.last().and_then(|s| s.next()) {
            path.push(next);
        }
        assert_eq!(path.last(), Some(&OrderStatus::Delivered));
        assert_eq!(path.len(), 4);
        assert_eq!(OrderStatus::Cancelled.next(), None);
    }

    #[test]
    fn new_order_items_default_to_empty() {
        let parsed: NewOrder = serde_json::from_str(r#"{"userId": 1, "totalAmount": 10.5}"#).unwrap();
        assert!(parsed.order_items.is_empty());
    }
}
