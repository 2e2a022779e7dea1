use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::Order;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/:id", get(get_order))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub name: String,
    pub price: f64,
    pub customer_id: Uuid,
    #[serde(default)]
    pub order_time: Option<DateTime<Utc>>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    if !payload.price.is_finite() || payload.price < 0.0 {
        return Err(AppError::BadRequest(
            "price must be a non-negative number".to_string(),
        ));
    }

    if !state.persons.contains_key(&payload.customer_id) {
        return Err(AppError::PersonNotFound(payload.customer_id));
    }

    let order = Order {
        id: Uuid::new_v4(),
        name: payload.name,
        price: payload.price,
        customer_id: payload.customer_id,
        order_time: payload.order_time.unwrap_or_else(Utc::now),
    };

    state.orders.insert(order.id, order.clone());
    info!(order_id = %order.id, price = order.price, "order created");

    Ok(Json(order))
}

async fn list_orders(State(state): State<Arc<AppState>>) -> Json<Vec<Order>> {
    let orders = state
        .orders
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(orders)
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state.orders.get(&id).ok_or(AppError::OrderNotFound(id))?;

    Ok(Json(order.value().clone()))
}
