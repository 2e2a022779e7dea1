use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("order {0} not found")]
    OrderNotFound(Uuid),

    #[error("person {0} not found")]
    PersonNotFound(Uuid),

    #[error("courier {0} is already delivering an order")]
    CourierBusy(Uuid),

    #[error("delivery {0} not found")]
    DeliveryNotFound(Uuid),

    #[error("delivery {0} is already completed")]
    AlreadyCompleted(Uuid),

    #[error("start time {start} must be before end time {end}")]
    InvalidTimeRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::OrderNotFound(_)
            | AppError::PersonNotFound(_)
            | AppError::DeliveryNotFound(_) => StatusCode::NOT_FOUND,
            AppError::CourierBusy(_) | AppError::AlreadyCompleted(_) => StatusCode::CONFLICT,
            AppError::InvalidTimeRange { .. } | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
