use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Created,
    Active,
    Completed,
}

/// A courier's assignment to one order, from pickup to completion.
///
/// `end_time` is set exactly when `status` is `Completed`, and `commission`
/// is only ever written by the commission calculator.
#[derive(Debug, Clone, Serialize)]
pub struct Delivery {
    pub id: Uuid,
    pub order_id: Uuid,
    pub courier_id: Uuid,
    pub customer_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub distance: Option<f64>,
    pub price: f64,
    pub commission: f64,
    pub status: DeliveryStatus,
}

/// The response shape shared by every delivery endpoint. Each call site
/// fills in the subset it is responsible for through its own constructor.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryResponse {
    pub id: Uuid,
    pub courier_id: Uuid,
    pub order_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub distance: Option<f64>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: DeliveryStatus,
    pub price: Option<f64>,
    pub commission: Option<f64>,
}

impl DeliveryResponse {
    pub fn created(delivery: &Delivery) -> Self {
        Self {
            id: delivery.id,
            courier_id: delivery.courier_id,
            order_id: None,
            customer_id: None,
            distance: None,
            start_time: delivery.start_time,
            end_time: None,
            status: delivery.status,
            price: None,
            commission: None,
        }
    }

    pub fn completed(delivery: &Delivery) -> Self {
        Self {
            end_time: delivery.end_time,
            commission: Some(delivery.commission),
            distance: delivery.distance,
            ..Self::created(delivery)
        }
    }

    pub fn detail(delivery: &Delivery) -> Self {
        Self {
            order_id: Some(delivery.order_id),
            customer_id: Some(delivery.customer_id),
            distance: delivery.distance,
            end_time: delivery.end_time,
            price: Some(delivery.price),
            commission: Some(delivery.commission),
            ..Self::created(delivery)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeliveryEvent {
    Created(DeliveryResponse),
    Completed(DeliveryResponse),
    Overdue {
        delivery_id: Uuid,
        courier_id: Uuid,
        start_time: DateTime<Utc>,
    },
}
