use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;
use crate::store::CourierCommissionRow;

#[derive(Debug, Clone, Serialize)]
pub struct CourierCommission {
    pub courier_id: Uuid,
    pub courier_name: String,
    pub total_commission: f64,
    pub total_completed_orders: u64,
    pub average_commission_per_order: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourierRanking {
    pub couriers: Vec<CourierCommission>,
    pub average_commission_of_top: f64,
}

/// Ranks couriers by commission earned on deliveries completed within the
/// window. Couriers with equal totals keep the store's grouping order.
///
/// With `limit`, only the first `limit` couriers are kept and the average is
/// taken over those.
pub fn top_couriers(
    state: &AppState,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    limit: Option<usize>,
) -> Result<CourierRanking, AppError> {
    if start_time >= end_time {
        return Err(AppError::InvalidTimeRange {
            start: start_time,
            end: end_time,
        });
    }

    let rows = state
        .deliveries
        .grouped_commission_by_time_range(start_time, end_time, |id| state.person_name(id));

    let ranking = rank(rows, limit);

    info!(
        start_time = %start_time,
        end_time = %end_time,
        couriers = ranking.couriers.len(),
        average_commission_of_top = ranking.average_commission_of_top,
        "courier ranking computed"
    );

    Ok(ranking)
}

fn rank(mut rows: Vec<CourierCommissionRow>, limit: Option<usize>) -> CourierRanking {
    // sort_by is stable, so ties stay in grouping order
    rows.sort_by(|a, b| b.total_commission.total_cmp(&a.total_commission));

    if let Some(limit) = limit {
        rows.truncate(limit);
    }

    let couriers: Vec<CourierCommission> = rows
        .into_iter()
        .map(|row| CourierCommission {
            average_commission_per_order: average_per_order(
                row.total_commission,
                row.completed_count,
            ),
            courier_id: row.courier_id,
            courier_name: row.courier_name,
            total_commission: row.total_commission,
            total_completed_orders: row.completed_count,
        })
        .collect();

    let average_of_top = if couriers.is_empty() {
        0.0
    } else {
        let total: f64 = couriers.iter().map(|c| c.total_commission).sum();
        total / couriers.len() as f64
    };

    CourierRanking {
        couriers,
        average_commission_of_top: average_of_top.max(0.0),
    }
}

fn average_per_order(total_commission: f64, completed: u64) -> f64 {
    if completed == 0 {
        return 0.0;
    }

    total_commission / completed as f64
}
