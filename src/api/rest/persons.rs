use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::person::{Person, PersonRole};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/persons", post(register_person).get(list_persons))
        .route("/persons/:id", get(get_person))
}

#[derive(Deserialize)]
pub struct RegisterPersonRequest {
    pub name: String,
    pub email: String,
    pub registration_number: Option<String>,
    pub role: PersonRole,
}

async fn register_person(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterPersonRequest>,
) -> Result<Json<Person>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    if !payload.email.contains('@') {
        return Err(AppError::BadRequest("email is not valid".to_string()));
    }

    if payload.role == PersonRole::Admin {
        return Err(AppError::BadRequest(
            "role must be either CUSTOMER or DELIVERY_MAN".to_string(),
        ));
    }

    let person = Person {
        id: Uuid::new_v4(),
        name: payload.name,
        email: payload.email,
        registration_number: payload.registration_number,
        role: payload.role,
    };

    state.persons.insert(person.id, person.clone());
    info!(person_id = %person.id, role = ?person.role, "person registered");

    Ok(Json(person))
}

async fn list_persons(State(state): State<Arc<AppState>>) -> Json<Vec<Person>> {
    let persons = state
        .persons
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(persons)
}

async fn get_person(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Person>, AppError> {
    let person = state
        .persons
        .get(&id)
        .ok_or(AppError::PersonNotFound(id))?;

    Ok(Json(person.value().clone()))
}
