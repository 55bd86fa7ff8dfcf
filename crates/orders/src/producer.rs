use kiln_broker::{Envelope, Publisher};
use tracing::info;

use crate::error::OrderError;
use crate::event::OrderEvent;
use crate::order::{Order, OrderStatus};
use crate::topics;

/// Publishes order lifecycle events to `order-events`.
#[derive(Debug, Clone)]
pub struct OrderEventProducer<P> {
    publisher: P,
}

impl<P> OrderEventProducer<P>
where
    P: Publisher,
{
    pub fn new(publisher: P) -> Self {
        Self { publisher }
    }

    pub fn order_created(&self, order: &Order) -> Result<Envelope, OrderError> {
        self.send(OrderEvent::created(order))
    }

    pub fn status_changed(&self, order: &Order, old_status: OrderStatus) -> Result<Envelope, OrderError> {
        self.send(OrderEvent::status_changed(order, old_status))
    }

    pub fn deleted(&self, order: &Order) -> Result<Envelope, OrderError> {
        self.send(OrderEvent::deleted(order))
    }

    fn send(&self, event: OrderEvent) -> Result<Envelope, OrderError> {
        let payload = serde_json::to_value(&event)?;
        let envelope = self.publisher.publish(topics::ORDER_EVENTS, payload)?;
        info!(
            order_id = event.order_id,
            event_type = %event.event_type,
            offset = envelope.offset(),
            "order event sent"
        );
        Ok(envelope)
    }
}
