use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::commission::commission;
use crate::error::AppError;
use crate::models::delivery::{Delivery, DeliveryEvent, DeliveryResponse, DeliveryStatus};
use crate::state::AppState;

/// A courier's pickup request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDelivery {
    pub order_id: Uuid,
    pub courier_id: Uuid,
    pub customer_id: Uuid,
    pub distance: Option<f64>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
}

pub fn create_delivery(
    state: &AppState,
    candidate: NewDelivery,
) -> Result<DeliveryResponse, AppError> {
    let start = Instant::now();
    let courier_id = candidate.courier_id;
    let order_id = candidate.order_id;

    let result = try_create(state, candidate);
    state
        .metrics
        .record_operation("create", result.is_ok(), start.elapsed().as_secs_f64());

    match result {
        Ok(saved) => {
            state.metrics.active_deliveries.inc();
            info!(
                delivery_id = %saved.id,
                courier_id = %saved.courier_id,
                order_id = %saved.order_id,
                commission = saved.commission,
                "delivery picked up"
            );
            state.publish(DeliveryEvent::Created(DeliveryResponse::detail(&saved)));
            Ok(DeliveryResponse::created(&saved))
        }
        Err(err) => {
            warn!(courier_id = %courier_id, order_id = %order_id, error = %err, "delivery pickup rejected");
            Err(err)
        }
    }
}

fn try_create(state: &AppState, candidate: NewDelivery) -> Result<Delivery, AppError> {
    if let Some(distance) = candidate.distance {
        validate_distance(distance)?;
    }

    let order_price = state
        .orders
        .get(&candidate.order_id)
        .map(|order| order.price)
        .ok_or(AppError::OrderNotFound(candidate.order_id))?;

    if !state.persons.contains_key(&candidate.courier_id) {
        return Err(AppError::PersonNotFound(candidate.courier_id));
    }

    let active = state
        .deliveries
        .count_by_courier_and_status(candidate.courier_id, DeliveryStatus::Active);
    if active > 0 {
        return Err(AppError::CourierBusy(candidate.courier_id));
    }

    let delivery = Delivery {
        id: Uuid::nil(),
        order_id: candidate.order_id,
        courier_id: candidate.courier_id,
        customer_id: candidate.customer_id,
        start_time: candidate.start_time.unwrap_or_else(Utc::now),
        end_time: None,
        distance: candidate.distance,
        price: order_price,
        commission: commission(order_price, candidate.distance.unwrap_or(0.0)),
        status: DeliveryStatus::Active,
    };

    // A concurrent pickup can pass the count above; the store's slot
    // constraint rejects it with CourierBusy.
    state.deliveries.insert(delivery)
}

pub fn complete_delivery(
    state: &AppState,
    distance: f64,
    delivery_id: Uuid,
) -> Result<DeliveryResponse, AppError> {
    let start = Instant::now();
    let mut was_active = false;

    let result = validate_distance(distance).and_then(|()| {
        state.deliveries.update(delivery_id, |delivery| {
            if delivery.status == DeliveryStatus::Completed {
                return Err(AppError::AlreadyCompleted(delivery.id));
            }

            let order_price = state
                .orders
                .get(&delivery.order_id)
                .map(|order| order.price)
                .ok_or(AppError::OrderNotFound(delivery.order_id))?;

            was_active = delivery.status == DeliveryStatus::Active;
            delivery.distance = Some(distance);
            delivery.commission = commission(order_price, distance);
            delivery.end_time = Some(Utc::now());
            delivery.status = DeliveryStatus::Completed;
            Ok(())
        })
    });

    state
        .metrics
        .record_operation("complete", result.is_ok(), start.elapsed().as_secs_f64());

    match result {
        Ok(completed) => {
            if was_active {
                state.metrics.active_deliveries.dec();
            }
            info!(
                delivery_id = %completed.id,
                courier_id = %completed.courier_id,
                distance,
                commission = completed.commission,
                "delivery completed"
            );
            let response = DeliveryResponse::completed(&completed);
            state.publish(DeliveryEvent::Completed(response.clone()));
            Ok(response)
        }
        Err(err) => {
            warn!(delivery_id = %delivery_id, error = %err, "delivery completion rejected");
            Err(err)
        }
    }
}

pub fn find_by_id(state: &AppState, delivery_id: Uuid) -> Result<DeliveryResponse, AppError> {
    state
        .deliveries
        .find_by_id(delivery_id)
        .map(|delivery| DeliveryResponse::detail(&delivery))
        .ok_or(AppError::DeliveryNotFound(delivery_id))
}

fn validate_distance(distance: f64) -> Result<(), AppError> {
    if distance.is_finite() && distance >= 0.0 {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "distance must be a non-negative number, got {distance}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{NewDelivery, complete_delivery, create_delivery, find_by_id};
    use crate::error::AppError;
    use crate::models::delivery::{DeliveryEvent, DeliveryStatus};
    use crate::models::order::Order;
    use crate::models::person::{Person, PersonRole};
    use crate::state::AppState;

    fn person(state: &AppState, seed: u128, role: PersonRole) -> Uuid {
        let id = Uuid::from_u128(seed);
        state.persons.insert(
            id,
            Person {
                id,
                name: format!("person-{seed}"),
                email: format!("person-{seed}@example.com"),
                registration_number: None,
                role,
            },
        );
        id
    }

    fn order(state: &AppState, seed: u128, price: f64, customer_id: Uuid) -> Uuid {
        let id = Uuid::from_u128(seed);
        state.orders.insert(
            id,
            Order {
                id,
                name: format!("order-{seed}"),
                price,
                customer_id,
                order_time: Utc::now(),
            },
        );
        id
    }

    struct Fixture {
        state: AppState,
        courier: Uuid,
        customer: Uuid,
        order: Uuid,
    }

    fn fixture() -> Fixture {
        let state = AppState::new(16);
        let courier = person(&state, 7, PersonRole::DeliveryMan);
        let customer = person(&state, 100, PersonRole::Customer);
        let order = order(&state, 1, 100.0, customer);
        Fixture {
            state,
            courier,
            customer,
            order,
        }
    }

    fn pickup(f: &Fixture, distance: f64) -> NewDelivery {
        NewDelivery {
            order_id: f.order,
            courier_id: f.courier,
            customer_id: f.customer,
            distance: Some(distance),
            start_time: None,
        }
    }

    #[test]
    fn pickup_is_active_with_commission_from_price_and_distance() {
        let f = fixture();

        let created = create_delivery(&f.state, pickup(&f, 10.0)).unwrap();
        assert_eq!(created.status, DeliveryStatus::Active);
        assert_eq!(created.courier_id, f.courier);
        assert!(created.end_time.is_none());

        let stored = f.state.deliveries.find_by_id(created.id).unwrap();
        assert!((stored.commission - 10.0).abs() < 1e-9);
        assert_eq!(stored.price, 100.0);
        assert_eq!(f.state.metrics.active_deliveries.get(), 1);
    }

    #[test]
    fn busy_courier_cannot_pick_up_second_order() {
        let f = fixture();
        create_delivery(&f.state, pickup(&f, 10.0)).unwrap();

        let err = create_delivery(&f.state, pickup(&f, 3.0)).unwrap_err();
        assert!(matches!(err, AppError::CourierBusy(id) if id == f.courier));
        assert_eq!(f.state.deliveries.len(), 1);
    }

    #[test]
    fn missing_order_is_reported_before_missing_courier() {
        let f = fixture();
        let mut candidate = pickup(&f, 1.0);
        candidate.order_id = Uuid::new_v4();
        candidate.courier_id = Uuid::new_v4();

        let err = create_delivery(&f.state, candidate).unwrap_err();
        assert!(matches!(err, AppError::OrderNotFound(_)));
    }

    #[test]
    fn unknown_courier_is_rejected() {
        let f = fixture();
        let mut candidate = pickup(&f, 1.0);
        candidate.courier_id = Uuid::new_v4();

        let err = create_delivery(&f.state, candidate).unwrap_err();
        assert!(matches!(err, AppError::PersonNotFound(_)));
        assert!(f.state.deliveries.is_empty());
    }

    #[test]
    fn negative_distance_is_rejected() {
        let f = fixture();

        let err = create_delivery(&f.state, pickup(&f, -1.0)).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(f.state.deliveries.is_empty());
    }

    #[test]
    fn pickup_without_distance_earns_price_share_only() {
        let f = fixture();
        let mut candidate = pickup(&f, 0.0);
        candidate.distance = None;

        let created = create_delivery(&f.state, candidate).unwrap();
        let stored = f.state.deliveries.find_by_id(created.id).unwrap();
        assert!((stored.commission - 5.0).abs() < 1e-9);
        assert!(stored.distance.is_none());
    }

    #[test]
    fn completion_recomputes_commission_from_final_distance() {
        let f = fixture();
        let created = create_delivery(&f.state, pickup(&f, 10.0)).unwrap();

        let completed = complete_delivery(&f.state, 15.0, created.id).unwrap();
        assert_eq!(completed.status, DeliveryStatus::Completed);
        assert!(completed.end_time.is_some());
        assert_eq!(completed.distance, Some(15.0));
        assert!((completed.commission.unwrap() - 12.5).abs() < 1e-9);
        assert_eq!(f.state.metrics.active_deliveries.get(), 0);
    }

    #[test]
    fn second_completion_fails_and_leaves_record_unchanged() {
        let f = fixture();
        let created = create_delivery(&f.state, pickup(&f, 10.0)).unwrap();
        complete_delivery(&f.state, 15.0, created.id).unwrap();
        let before = f.state.deliveries.find_by_id(created.id).unwrap();

        let err = complete_delivery(&f.state, 40.0, created.id).unwrap_err();
        assert!(matches!(err, AppError::AlreadyCompleted(id) if id == created.id));

        let after = f.state.deliveries.find_by_id(created.id).unwrap();
        assert_eq!(after.commission, before.commission);
        assert_eq!(after.distance, before.distance);
        assert_eq!(after.end_time, before.end_time);
    }

    #[test]
    fn negative_completion_distance_is_rejected_without_touching_record() {
        let f = fixture();
        let created = create_delivery(&f.state, pickup(&f, 10.0)).unwrap();

        let err = complete_delivery(&f.state, -1.0, created.id).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let stored = f.state.deliveries.find_by_id(created.id).unwrap();
        assert_eq!(stored.status, DeliveryStatus::Active);
        assert!((stored.commission - 10.0).abs() < 1e-9);
        assert_eq!(stored.distance, Some(10.0));
        assert!(stored.end_time.is_none());
    }

    #[test]
    fn completion_distance_is_checked_before_lookup() {
        let f = fixture();

        let err = complete_delivery(&f.state, -1.0, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = complete_delivery(&f.state, f64::NAN, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn completion_without_registered_order_fails() {
        let f = fixture();
        let created = create_delivery(&f.state, pickup(&f, 10.0)).unwrap();
        f.state.orders.remove(&f.order);

        let err = complete_delivery(&f.state, 15.0, created.id).unwrap_err();
        assert!(matches!(err, AppError::OrderNotFound(id) if id == f.order));

        let stored = f.state.deliveries.find_by_id(created.id).unwrap();
        assert_eq!(stored.status, DeliveryStatus::Active);
        assert_eq!(f.state.deliveries.active_len(), 1);
    }

    #[test]
    fn completing_unknown_delivery_is_not_found() {
        let f = fixture();

        let err = complete_delivery(&f.state, 1.0, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::DeliveryNotFound(_)));
    }

    #[test]
    fn courier_is_free_again_after_completion() {
        let f = fixture();
        let created = create_delivery(&f.state, pickup(&f, 10.0)).unwrap();
        complete_delivery(&f.state, 12.0, created.id).unwrap();

        assert!(create_delivery(&f.state, pickup(&f, 2.0)).is_ok());
    }

    #[test]
    fn find_returns_full_detail() {
        let f = fixture();
        let created = create_delivery(&f.state, pickup(&f, 10.0)).unwrap();

        let detail = find_by_id(&f.state, created.id).unwrap();
        assert_eq!(detail.order_id, Some(f.order));
        assert_eq!(detail.customer_id, Some(f.customer));
        assert_eq!(detail.price, Some(100.0));
        assert!((detail.commission.unwrap() - 10.0).abs() < 1e-9);

        let err = find_by_id(&f.state, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::DeliveryNotFound(_)));
    }

    #[test]
    fn lifecycle_transitions_are_published() {
        let f = fixture();
        let mut rx = f.state.delivery_events_tx.subscribe();

        let created = create_delivery(&f.state, pickup(&f, 10.0)).unwrap();
        complete_delivery(&f.state, 15.0, created.id).unwrap();

        assert!(matches!(rx.try_recv().unwrap(), DeliveryEvent::Created(d) if d.id == created.id));
        assert!(
            matches!(rx.try_recv().unwrap(), DeliveryEvent::Completed(d) if d.id == created.id)
        );
    }
}
