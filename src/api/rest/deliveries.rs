use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::lifecycle::{self, NewDelivery};
use crate::engine::ranking::{self, CourierRanking};
use crate::error::AppError;
use crate::models::delivery::DeliveryResponse;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/deliveries", post(create_delivery))
        .route("/deliveries/:id", get(get_delivery))
        .route("/deliveries/:id/complete", post(complete_delivery))
        .route("/rankings/couriers", get(top_couriers))
}

#[derive(Deserialize)]
pub struct CompleteDeliveryRequest {
    pub distance: f64,
}

#[derive(Deserialize)]
pub struct RankingQuery {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub limit: Option<usize>,
}

async fn create_delivery(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewDelivery>,
) -> Result<Json<DeliveryResponse>, AppError> {
    lifecycle::create_delivery(&state, payload).map(Json)
}

async fn complete_delivery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteDeliveryRequest>,
) -> Result<Json<DeliveryResponse>, AppError> {
    lifecycle::complete_delivery(&state, payload.distance, id).map(Json)
}

async fn get_delivery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeliveryResponse>, AppError> {
    lifecycle::find_by_id(&state, id).map(Json)
}

async fn top_couriers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RankingQuery>,
) -> Result<Json<CourierRanking>, AppError> {
    ranking::top_couriers(&state, query.start_time, query.end_time, query.limit).map(Json)
}
