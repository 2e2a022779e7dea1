use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::delivery::{Delivery, DeliveryStatus};

/// Per-courier commission totals over completed deliveries.
#[derive(Debug, Clone, PartialEq)]
pub struct CourierCommissionRow {
    pub courier_id: Uuid,
    pub courier_name: String,
    pub total_commission: f64,
    pub completed_count: u64,
}

/// In-memory delivery records.
///
/// `active_by_courier` is the uniqueness constraint behind the single active
/// delivery rule: a courier's slot is claimed through the entry API when an
/// ACTIVE record is inserted and released once that record leaves ACTIVE.
/// Lock order is always slot then record; `update` drops the record guard
/// before touching the slot index, so a slot can briefly outlive its
/// holder's ACTIVE status and `insert` checks the holder before refusing.
pub struct DeliveryStore {
    records: DashMap<Uuid, Delivery>,
    active_by_courier: DashMap<Uuid, Uuid>,
}

impl DeliveryStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            active_by_courier: DashMap::new(),
        }
    }

    /// Persists a new record under a freshly assigned id.
    pub fn insert(&self, mut delivery: Delivery) -> Result<Delivery, AppError> {
        delivery.id = Uuid::new_v4();

        if delivery.status != DeliveryStatus::Active {
            self.records.insert(delivery.id, delivery.clone());
            return Ok(delivery);
        }

        match self.active_by_courier.entry(delivery.courier_id) {
            Entry::Occupied(mut slot) => {
                // `update` releases the slot after the holder left ACTIVE;
                // a holder seen in that window is reclaimed here.
                if self.holds_active(*slot.get()) {
                    return Err(AppError::CourierBusy(delivery.courier_id));
                }
                self.records.insert(delivery.id, delivery.clone());
                slot.insert(delivery.id);
                Ok(delivery)
            }
            Entry::Vacant(slot) => {
                self.records.insert(delivery.id, delivery.clone());
                slot.insert(delivery.id);
                Ok(delivery)
            }
        }
    }

    /// Applies `apply` to a copy of the record while holding its write guard
    /// and writes the copy back only if `apply` succeeds.
    pub fn update<F>(&self, id: Uuid, apply: F) -> Result<Delivery, AppError>
    where
        F: FnOnce(&mut Delivery) -> Result<(), AppError>,
    {
        let updated = {
            let mut record = self
                .records
                .get_mut(&id)
                .ok_or(AppError::DeliveryNotFound(id))?;

            let mut candidate = record.value().clone();
            apply(&mut candidate)?;
            *record = candidate.clone();
            candidate
        };

        if updated.status != DeliveryStatus::Active {
            self.active_by_courier
                .remove_if(&updated.courier_id, |_, held| *held == updated.id);
        }

        Ok(updated)
    }

    fn holds_active(&self, id: Uuid) -> bool {
        self.records
            .get(&id)
            .is_some_and(|record| record.status == DeliveryStatus::Active)
    }

    pub fn find_by_id(&self, id: Uuid) -> Option<Delivery> {
        self.records.get(&id).map(|entry| entry.value().clone())
    }

    pub fn count_by_courier_and_status(&self, courier_id: Uuid, status: DeliveryStatus) -> usize {
        self.records
            .iter()
            .filter(|entry| entry.courier_id == courier_id && entry.status == status)
            .count()
    }

    /// Groups COMPLETED deliveries whose start time lies in `[start, end]`
    /// by courier. Groups come back in courier id order, unsorted by
    /// commission.
    pub fn grouped_commission_by_time_range<N>(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        courier_name: N,
    ) -> Vec<CourierCommissionRow>
    where
        N: Fn(Uuid) -> String,
    {
        let mut groups: BTreeMap<Uuid, (f64, u64)> = BTreeMap::new();

        for entry in self.records.iter() {
            let delivery = entry.value();
            let in_window = delivery.start_time >= start && delivery.start_time <= end;

            if delivery.status == DeliveryStatus::Completed && in_window {
                let group = groups.entry(delivery.courier_id).or_insert((0.0, 0));
                group.0 += delivery.commission;
                group.1 += 1;
            }
        }

        groups
            .into_iter()
            .map(|(courier_id, (total_commission, completed_count))| CourierCommissionRow {
                courier_id,
                courier_name: courier_name(courier_id),
                total_commission,
                completed_count,
            })
            .collect()
    }

    /// Deliveries in `status` that started strictly before `threshold`,
    /// oldest first.
    pub fn find_by_status_and_start_before(
        &self,
        status: DeliveryStatus,
        threshold: DateTime<Utc>,
    ) -> Vec<Delivery> {
        let mut matches: Vec<Delivery> = self
            .records
            .iter()
            .filter(|entry| entry.status == status && entry.start_time < threshold)
            .map(|entry| entry.value().clone())
            .collect();

        matches.sort_by_key(|delivery| delivery.start_time);
        matches
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn active_len(&self) -> usize {
        self.active_by_courier.len()
    }
}

impl Default for DeliveryStore {
    fn default() -> Self {
        Self::new()
    }
}
