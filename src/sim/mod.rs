pub mod registry;
pub mod run;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::courier::GeoPoint;

/// Motion sub-state of an active delivery. Distinct from the order
/// status: the order is `on_the_way` for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Preparing,
    PickedUp,
    Delivering,
    Arrived,
}

/// Simulator tuning knobs, loaded from the environment in `Config`.
///
/// `traffic_probability` is the per-tick Bernoulli chance of a pause;
/// zero disables the traffic model entirely. `seed` pins the RNG for
/// reproducible runs.
#[derive(Debug, Clone)]
pub struct SimSettings {
    pub speed_mps: f64,
    pub tick_interval_ms: u64,
    pub arrival_threshold_m: f64,
    pub pickup_delay_ms: u64,
    pub delivering_delay_ms: u64,
    pub traffic_probability: f64,
    pub traffic_pause_min_ms: u64,
    pub traffic_pause_max_ms: u64,
    pub seed: Option<u64>,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            speed_mps: 10.0,
            tick_interval_ms: 250,
            arrival_threshold_m: 20.0,
            pickup_delay_ms: 2_000,
            delivering_delay_ms: 3_500,
            traffic_probability: 0.08,
            traffic_pause_min_ms: 2_000,
            traffic_pause_max_ms: 6_000,
            seed: None,
        }
    }
}

/// Read-only per-tick view handed to the tracking/display side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingSnapshot {
    pub courier_id: Uuid,
    pub order_id: Uuid,
    pub phase: Phase,
    pub position: GeoPoint,
    /// `None` while the order is still being prepared.
    pub eta_minutes: Option<u64>,
    pub distance_remaining_meters: f64,
}
