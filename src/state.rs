use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::delivery::DeliveryEvent;
use crate::models::order::Order;
use crate::models::person::Person;
use crate::observability::metrics::Metrics;
use crate::store::DeliveryStore;

pub struct AppState {
    pub persons: DashMap<Uuid, Person>,
    pub orders: DashMap<Uuid, Order>,
    pub deliveries: DeliveryStore,
    pub delivery_events_tx: broadcast::Sender<DeliveryEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(event_buffer_size: usize) -> Self {
        let (delivery_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            persons: DashMap::new(),
            orders: DashMap::new(),
            deliveries: DeliveryStore::new(),
            delivery_events_tx,
            metrics: Metrics::new(),
        }
    }

    /// Publishes to websocket subscribers; having none is not an error.
    pub fn publish(&self, event: DeliveryEvent) {
        let _ = self.delivery_events_tx.send(event);
    }

    pub fn person_name(&self, id: Uuid) -> String {
        self.persons
            .get(&id)
            .map(|person| person.name.clone())
            .unwrap_or_default()
    }
}
