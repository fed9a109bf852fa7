use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub orders_created_total: IntCounter,
    pub orders_delivered_total: IntCounter,
    pub assignments_total: IntCounterVec,
    pub active_runs: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let orders_created_total =
            IntCounter::new("orders_created_total", "Total orders created")
                .expect("valid orders_created_total metric");

        let orders_delivered_total =
            IntCounter::new("orders_delivered_total", "Total orders delivered")
                .expect("valid orders_delivered_total metric");

        let assignments_total = IntCounterVec::new(
            Opts::new("assignments_total", "Total assignment attempts by outcome"),
            &["outcome"],
        )
        .expect("valid assignments_total metric");

        let active_runs = IntGauge::new(
            "active_simulation_runs",
            "Currently running delivery simulations",
        )
        .expect("valid active_simulation_runs metric");

        registry
            .register(Box::new(orders_created_total.clone()))
            .expect("register orders_created_total");
        registry
            .register(Box::new(orders_delivered_total.clone()))
            .expect("register orders_delivered_total");
        registry
            .register(Box::new(assignments_total.clone()))
            .expect("register assignments_total");
        registry
            .register(Box::new(active_runs.clone()))
            .expect("register active_simulation_runs");

        Self {
            registry,
            orders_created_total,
            orders_delivered_total,
            assignments_total,
            active_runs,
        }
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
