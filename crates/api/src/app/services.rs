use std::{collections::BTreeMap, convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use kiln_broker::{Broker, BrokerConfig, BrokerError};
use kiln_orders::{
    NewOrder, Order, OrderBook, OrderError, OrderEventProducer, OrderStatus, install_consumers,
};
use tokio_stream::{StreamExt, wrappers::BroadcastStream};
use tracing::warn;

use crate::app::dto::{BrokerHealth, BrokerStatus, HealthView};

/// Shared state behind every route: the broker, the order book, and the
/// producer that turns order changes into `order-events`.
#[derive(Debug)]
pub struct AppServices {
    pub broker: Broker,
    pub orders: OrderBook,
    producer: OrderEventProducer<Broker>,
}

/// Create the broker on the current runtime and install the order consumers.
pub fn build_services(config: BrokerConfig) -> Result<AppServices, BrokerError> {
    let broker = Broker::new(config)?;
    install_consumers(&broker);
    Ok(AppServices::new(broker))
}

impl AppServices {
    pub fn new(broker: Broker) -> Self {
        Self {
            producer: OrderEventProducer::new(broker.clone()),
            orders: OrderBook::new(),
            broker,
        }
    }

    // Each mutation below is undone when its event cannot be published, so the
    // book never shows a change that `order-events` does not.

    pub fn create_order(&self, new: NewOrder) -> Result<Order, OrderError> {
        let order = self.orders.create(new)?;
        if let Err(err) = self.producer.order_created(&order) {
            warn!(order_id = order.id, error = %err, "rolling back order create");
            let _ = self.orders.delete(order.id);
            return Err(err);
        }
        Ok(order)
    }

    pub fn update_order_status(&self, id: u64, status: OrderStatus) -> Result<Order, OrderError> {
        let before = self.orders.get(id).ok_or(OrderError::NotFound(id))?;
        let (order, old) = self.orders.update_status(id, status)?;
        if let Err(err) = self.producer.status_changed(&order, old) {
            warn!(order_id = id, error = %err, "rolling back status update");
            self.orders.restore(before);
            return Err(err);
        }
        Ok(order)
    }

    pub fn delete_order(&self, id: u64) -> Result<Order, OrderError> {
        let order = self.orders.delete(id)?;
        if let Err(err) = self.producer.deleted(&order) {
            warn!(order_id = id, error = %err, "rolling back order delete");
            self.orders.restore(order);
            return Err(err);
        }
        Ok(order)
    }

    /// Move every order one step along its fulfilment path, one event each.
    ///
    /// Delivered and cancelled orders are left as they are.
    pub fn advance_orders(&self) -> Result<Vec<Order>, OrderError> {
        for order in self.orders.list() {
            if let Some(next) = order.status.next() {
                self.update_order_status(order.id, next)?;
            }
        }
        Ok(self.orders.list())
    }

    pub fn broker_status(&self) -> BrokerStatus {
        let topics = self
            .broker
            .topics()
            .into_iter()
            .map(|name| {
                let info = self.broker.topic_info(&name);
                (name, info)
            })
            .collect::<BTreeMap<_, _>>();

        BrokerStatus {
            topics,
            total_messages: self.broker.total_messages(),
            consumers: self.broker.consumer_keys(),
            stats: self.broker.stats(),
        }
    }

    pub fn health(&self) -> HealthView {
        let status = if self.broker.is_closed() { "DOWN" } else { "UP" };
        HealthView {
            status,
            components: [(
                "broker",
                BrokerHealth {
                    status,
                    topics: self.broker.topics(),
                    total_messages: self.broker.total_messages(),
                },
            )]
            .into_iter()
            .collect(),
        }
    }
}

/// Server-sent events for every finished delivery chain (lossy for slow clients).
pub fn outcome_sse_stream(
    services: Arc<AppServices>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.broker.outcomes();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(outcome) => {
            let event = if outcome.is_dead_lettered() { "dead_lettered" } else { "delivered" };
            let data = serde_json::to_string(&outcome).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(event).data(data)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
