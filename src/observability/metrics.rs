use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub delivery_operations_total: IntCounterVec,
    pub active_deliveries: IntGauge,
    pub delivery_operation_latency_seconds: HistogramVec,
    pub overdue_deliveries_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let delivery_operations_total = IntCounterVec::new(
            Opts::new(
                "delivery_operations_total",
                "Total delivery lifecycle operations by operation and outcome",
            ),
            &["operation", "outcome"],
        )
        .expect("valid delivery_operations_total metric");

        let active_deliveries =
            IntGauge::new("active_deliveries", "Current number of active deliveries")
                .expect("valid active_deliveries metric");

        let delivery_operation_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "delivery_operation_latency_seconds",
                "Latency of delivery lifecycle operations in seconds",
            ),
            &["operation"],
        )
        .expect("valid delivery_operation_latency_seconds metric");

        let overdue_deliveries_total = IntCounter::new(
            "overdue_deliveries_total",
            "Total overdue delivery notifications raised",
        )
        .expect("valid overdue_deliveries_total metric");

        registry
            .register(Box::new(delivery_operations_total.clone()))
            .expect("register delivery_operations_total");
        registry
            .register(Box::new(active_deliveries.clone()))
            .expect("register active_deliveries");
        registry
            .register(Box::new(delivery_operation_latency_seconds.clone()))
            .expect("register delivery_operation_latency_seconds");
        registry
            .register(Box::new(overdue_deliveries_total.clone()))
            .expect("register overdue_deliveries_total");

        Self {
            registry,
            delivery_operations_total,
            active_deliveries,
            delivery_operation_latency_seconds,
            overdue_deliveries_total,
        }
    }

    pub fn record_operation(&self, operation: &str, success: bool, elapsed_secs: f64) {
        let outcome = if success { "success" } else { "error" };
        self.delivery_operations_total
            .with_label_values(&[operation, outcome])
            .inc();
        self.delivery_operation_latency_seconds
            .with_label_values(&[operation])
            .observe(elapsed_secs);
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
