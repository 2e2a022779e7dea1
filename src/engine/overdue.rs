use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::models::delivery::{Delivery, DeliveryEvent, DeliveryStatus};
use crate::state::AppState;

pub async fn run_overdue_monitor(
    state: Arc<AppState>,
    threshold: ChronoDuration,
    check_every: Duration,
) {
    info!(
        threshold_minutes = threshold.num_minutes(),
        check_every_secs = check_every.as_secs(),
        "overdue monitor started"
    );

    let mut ticker = interval(check_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let overdue = scan_overdue(&state, Utc::now(), threshold);
        debug!(overdue = overdue.len(), "overdue scan finished");
    }
}

/// Raises a notification for every ACTIVE delivery that started more than
/// `threshold` before `now`. Returns the deliveries notified about.
pub fn scan_overdue(
    state: &AppState,
    now: DateTime<Utc>,
    threshold: ChronoDuration,
) -> Vec<Delivery> {
    let Some(cutoff) = now.checked_sub_signed(threshold) else {
        warn!(
            threshold_minutes = threshold.num_minutes(),
            "overdue threshold reaches before the earliest representable time; skipping scan"
        );
        return Vec::new();
    };

    let overdue = state
        .deliveries
        .find_by_status_and_start_before(DeliveryStatus::Active, cutoff);

    for delivery in &overdue {
        notify_customer_support(state, delivery);
    }

    overdue
}

fn notify_customer_support(state: &AppState, delivery: &Delivery) {
    warn!(
        delivery_id = %delivery.id,
        courier_id = %delivery.courier_id,
        start_time = %delivery.start_time,
        "delivery is overdue; notifying customer support"
    );

    state.metrics.overdue_deliveries_total.inc();
    state.publish(DeliveryEvent::Overdue {
        delivery_id: delivery.id,
        courier_id: delivery.courier_id,
        start_time: delivery.start_time,
    });
}
