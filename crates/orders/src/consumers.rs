//! Consumer groups of the order flow.

use anyhow::Context;
use kiln_broker::{Broker, Envelope, HandlerResult, Publisher};
use serde::Serialize;
use tracing::{info, warn};

use crate::event::{
    InventoryEvent, InventoryEventType, NotificationEvent, NotificationEventType, OrderEvent,
    OrderEventType,
};
use crate::order::OrderStatus;
use crate::topics;

/// Create the order topics and register the three consumer groups.
pub fn install_consumers(broker: &Broker) {
    for topic in topics::ALL {
        broker.ensure_topic(topic);
    }

    let publisher = broker.clone();
    broker.subscribe(
        topics::ORDER_EVENTS,
        topics::ORDER_PROCESSING_GROUP,
        move |env: &Envelope| -> HandlerResult { process_order_event(&publisher, env) },
    );
    broker.subscribe(
        topics::NOTIFICATION_EVENTS,
        topics::NOTIFICATION_GROUP,
        |env: &Envelope| -> HandlerResult { log_event("notification", env) },
    );
    broker.subscribe(
        topics::INVENTORY_EVENTS,
        topics::INVENTORY_GROUP,
        |env: &Envelope| -> HandlerResult { log_event("inventory", env) },
    );
}

/// `order-processing-group` handler: derive inventory and notification events.
///
/// Unknown event types are acknowledged with a warning so they are not
/// retried; a known type with a malformed body fails the attempt.
pub fn process_order_event<P>(publisher: &P, envelope: &Envelope) -> HandlerResult
where
    P: Publisher + ?Sized,
{
    let event_type = envelope
        .value()
        .get("eventType")
        .and_then(|v| v.as_str())
        .unwrap_or_default();

    let Some(kind) = OrderEventType::parse(event_type) else {
        warn!(offset = envelope.offset(), event_type, "unknown order event type, skipping");
        return Ok(());
    };

    let event: OrderEvent = serde_json::from_value(envelope.value().clone())
        .with_context(|| format!("malformed {kind} event at offset {}", envelope.offset()))?;

    match kind {
        OrderEventType::OrderCreated => {
            let user_id = notified_user(&event, kind)?;
            info!(
                order_id = event.order_id,
                user_id,
                total_amount = ?event.total_amount,
                "processing created order"
            );
            send(
                publisher,
                topics::INVENTORY_EVENTS,
                &InventoryEvent::new(InventoryEventType::StockReserved, event.order_id),
            )?;
            send(
                publisher,
                topics::NOTIFICATION_EVENTS,
                &NotificationEvent::new(
                    NotificationEventType::OrderConfirmationEmail,
                    user_id,
                    event.order_id,
                ),
            )?;
        }
        OrderEventType::OrderStatusChanged => {
            info!(
                order_id = event.order_id,
                old_status = ?event.old_status,
                new_status = ?event.new_status,
                "processing status change"
            );
            if event.new_status == Some(OrderStatus::Delivered) {
                let user_id = notified_user(&event, kind)?;
                send(
                    publisher,
                    topics::NOTIFICATION_EVENTS,
                    &NotificationEvent::new(
                        NotificationEventType::OrderDeliveredNotification,
                        user_id,
                        event.order_id,
                    ),
                )?;
            }
        }
        OrderEventType::OrderDeleted => {
            info!(order_id = event.order_id, "processing deleted order");
            send(
                publisher,
                topics::INVENTORY_EVENTS,
                &InventoryEvent::new(InventoryEventType::StockReleased, event.order_id),
            )?;
        }
    }

    Ok(())
}

// Checked before anything is published so a retry does not duplicate events.
fn notified_user(event: &OrderEvent, kind: OrderEventType) -> anyhow::Result<u64> {
    event
        .user_id
        .with_context(|| format!("{kind} event for order {} has no userId", event.order_id))
}

fn send<P, T>(publisher: &P, topic: &str, event: &T) -> HandlerResult
where
    P: Publisher + ?Sized,
    T: Serialize,
{
    publisher.publish(topic, serde_json::to_value(event)?)?;
    Ok(())
}

fn log_event(consumer: &'static str, envelope: &Envelope) -> HandlerResult {
    let event_type = envelope
        .value()
        .get("eventType")
        .and_then(|v| v.as_str())
        .unwrap_or("<none>");
    info!(consumer, topic = %envelope.topic(), offset = envelope.offset(), event_type, "event received");
    Ok(())
}
