use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub customer_id: Uuid,
    pub order_time: DateTime<Utc>,
}
