//! Order lifecycle events on top of `kiln-broker`.
//!
//! The order book is the business side: it decides *when* something happened.
//! The producer turns those facts into `order-events` messages, and the
//! consumers registered by [`install_consumers`] react with derived inventory
//! and notification events.

pub mod consumers;
pub mod error;
pub mod event;
pub mod order;
pub mod producer;
pub mod topics;

pub use consumers::{install_consumers, process_order_event};
pub use error::OrderError;
pub use event::{
    InventoryEvent, InventoryEventType, NotificationEvent, NotificationEventType, OrderEvent,
    OrderEventType,
};
pub use order::{NewOrder, Order, OrderBook, OrderItem, OrderStatus};
pub use producer::OrderEventProducer;
