use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use crate::geo::{bearing_degrees, destination_point, distance_meters};
use crate::models::courier::GeoPoint;
use crate::sim::{Phase, SimSettings, TrackingSnapshot};

/// A vertex closer than this is considered reached even when the
/// per-tick step is shorter.
const SEGMENT_REACHED_M: f64 = 15.0;

/// Floor applied to the speed in the ETA division.
const MIN_ETA_SPEED_MPS: f64 = 1.0;

struct TrafficModel {
    probability: f64,
    pause_min_ms: u64,
    pause_max_ms: u64,
    rng: StdRng,
}

impl TrafficModel {
    fn new(settings: &SimSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            probability: settings.traffic_probability,
            pause_min_ms: settings.traffic_pause_min_ms,
            pause_max_ms: settings.traffic_pause_max_ms.max(settings.traffic_pause_min_ms),
            rng,
        }
    }

    /// One Bernoulli trial; on success returns when the pause ends.
    fn draw_pause(&mut self, now: Instant) -> Option<Instant> {
        if self.probability <= 0.0 {
            return None;
        }
        if self.rng.r#gen::<f64>() >= self.probability {
            return None;
        }
        let pause_ms = self.rng.gen_range(self.pause_min_ms..=self.pause_max_ms);
        Some(now + Duration::from_millis(pause_ms))
    }
}

/// Per-delivery position state machine, advanced by `tick`.
///
/// All timing comes in through the `now` argument, so tests drive it
/// with a fabricated clock instead of real timers.
pub struct SimRun {
    courier_id: Uuid,
    order_id: Uuid,
    route: Vec<GeoPoint>,
    position: GeoPoint,
    segment_index: usize,
    phase: Phase,
    running: bool,
    speed_mps: f64,
    tick_interval: Duration,
    arrival_threshold_m: f64,
    pickup_delay: Duration,
    delivering_delay: Duration,
    started_at: Instant,
    traffic_until: Option<Instant>,
    traffic: TrafficModel,
    traveled: Vec<GeoPoint>,
}

impl SimRun {
    /// `route` must have at least two vertices; the service builds it with
    /// `geo::route::build_route` and validates the destination first.
    pub fn new(
        courier_id: Uuid,
        order_id: Uuid,
        route: Vec<GeoPoint>,
        settings: &SimSettings,
        started_at: Instant,
    ) -> Self {
        let position = route[0].clone();
        Self {
            courier_id,
            order_id,
            traveled: vec![position.clone()],
            position,
            segment_index: 0,
            phase: Phase::Preparing,
            running: true,
            speed_mps: settings.speed_mps,
            tick_interval: Duration::from_millis(settings.tick_interval_ms),
            arrival_threshold_m: settings.arrival_threshold_m,
            pickup_delay: Duration::from_millis(settings.pickup_delay_ms),
            delivering_delay: Duration::from_millis(settings.delivering_delay_ms),
            started_at,
            traffic_until: None,
            traffic: TrafficModel::new(settings),
            route,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Arrived
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn traveled_path(&self) -> &[GeoPoint] {
        &self.traveled
    }

    fn destination(&self) -> &GeoPoint {
        &self.route[self.route.len() - 1]
    }

    fn segment_target(&self) -> &GeoPoint {
        let last = self.route.len() - 1;
        &self.route[(self.segment_index + 1).min(last)]
    }

    pub fn remaining_meters(&self) -> f64 {
        distance_meters(&self.position, self.destination())
    }

    /// Pickup and delivering are kitchen/handover latency, driven purely
    /// by elapsed time since the run started.
    fn advance_phase(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.started_at);
        match self.phase {
            Phase::Preparing if elapsed >= self.delivering_delay => {
                self.phase = Phase::Delivering;
            }
            Phase::Preparing if elapsed >= self.pickup_delay => {
                self.phase = Phase::PickedUp;
            }
            Phase::PickedUp if elapsed >= self.delivering_delay => {
                self.phase = Phase::Delivering;
            }
            _ => {}
        }
    }

    fn arrive(&mut self) {
        self.position = self.destination().clone();
        self.traveled.push(self.position.clone());
        self.phase = Phase::Arrived;
        self.running = false;
    }

    /// Advance one tick of simulated motion. A no-op while paused,
    /// already arrived, or still preparing.
    pub fn tick(&mut self, now: Instant) {
        if !self.running || self.phase == Phase::Arrived {
            return;
        }

        self.advance_phase(now);
        if !matches!(self.phase, Phase::PickedUp | Phase::Delivering) {
            return;
        }

        if let Some(until) = self.traffic_until {
            if now < until {
                return;
            }
            self.traffic_until = None;
        }
        if let Some(until) = self.traffic.draw_pause(now) {
            self.traffic_until = Some(until);
            return;
        }

        let meters = self.speed_mps * self.tick_interval.as_secs_f64();

        if self.remaining_meters() < self.arrival_threshold_m {
            self.arrive();
            return;
        }

        // Reached the current vertex; aim at the next one. Never advance
        // past the final segment.
        if distance_meters(&self.position, self.segment_target())
            < SEGMENT_REACHED_M.max(meters)
            && self.segment_index < self.route.len() - 2
        {
            self.segment_index += 1;
        }

        let target = self.segment_target().clone();
        if distance_meters(&self.position, &target) < f64::EPSILON {
            // Zero-length segment (degenerate route); bearing is
            // undefined, and the arrival check above already ran.
            return;
        }

        let bearing = bearing_degrees(&self.position, &target);
        self.position = destination_point(&self.position, bearing, meters);
        self.traveled.push(self.position.clone());
    }

    /// Freeze tick advancement without resetting anything.
    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn resume(&mut self) {
        if self.phase != Phase::Arrived {
            self.running = true;
        }
    }

    /// Administrative override: jump straight to the drop-off.
    pub fn skip_to_destination(&mut self) {
        self.arrive();
    }

    pub fn eta_minutes(&self) -> Option<u64> {
        match self.phase {
            Phase::Preparing => None,
            Phase::Arrived => Some(0),
            Phase::PickedUp | Phase::Delivering => {
                let seconds = self.remaining_meters() / self.speed_mps.max(MIN_ETA_SPEED_MPS);
                let minutes = (seconds / 60.0).ceil() as u64;
                Some(minutes.max(1))
            }
        }
    }

    pub fn snapshot(&self) -> TrackingSnapshot {
        TrackingSnapshot {
            courier_id: self.courier_id,
            order_id: self.order_id,
            phase: self.phase,
            position: self.position.clone(),
            eta_minutes: self.eta_minutes(),
            distance_remaining_meters: self.remaining_meters(),
        }
    }
}
