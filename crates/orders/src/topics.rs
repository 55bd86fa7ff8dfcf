//! Topic and consumer-group names.

pub const ORDER_EVENTS: &str = "order-events";
pub const INVENTORY_EVENTS: &str = "inventory-events";
pub const NOTIFICATION_EVENTS: &str = "notification-events";

pub const ORDER_PROCESSING_GROUP: &str = "order-processing-group";
pub const INVENTORY_GROUP: &str = "inventory-group";
pub const NOTIFICATION_GROUP: &str = "notification-group";

/// Every topic the order flow publishes to, in creation order.
pub const ALL: [&str; 3] = [ORDER_EVENTS, NOTIFICATION_EVENTS, INVENTORY_EVENTS];
