use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use crate::models::courier::GeoPoint;
use crate::observability::metrics::Metrics;
use crate::sim::run::SimRun;
use crate::sim::{Phase, SimSettings, TrackingSnapshot};

struct RunHandle {
    run_id: Uuid,
    sim: Arc<Mutex<SimRun>>,
    stopped: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// Active simulation runs, one per courier at most. Each run owns its own
/// tick task; runs for different couriers never block each other.
#[derive(Clone)]
pub struct RunRegistry {
    runs: Arc<DashMap<Uuid, RunHandle>>,
    metrics: Metrics,
}

impl RunRegistry {
    pub fn new(metrics: Metrics) -> Self {
        Self {
            runs: Arc::new(DashMap::new()),
            metrics,
        }
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Start a run for the courier, replacing any run a reassignment left
    /// behind. The caller has already validated the route destination.
    pub fn start(
        &self,
        courier_id: Uuid,
        order_id: Uuid,
        route: Vec<GeoPoint>,
        settings: &SimSettings,
        snapshots_tx: broadcast::Sender<TrackingSnapshot>,
    ) {
        self.stop(courier_id);

        let run_id = Uuid::new_v4();
        let sim = Arc::new(Mutex::new(SimRun::new(
            courier_id,
            order_id,
            route,
            settings,
            Instant::now(),
        )));
        let stopped = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(run_loop(
            sim.clone(),
            stopped.clone(),
            self.clone(),
            courier_id,
            run_id,
            snapshots_tx,
        ));

        self.runs.insert(
            courier_id,
            RunHandle {
                run_id,
                sim,
                stopped,
                task,
            },
        );
        self.metrics.active_runs.inc();
        info!(courier_id = %courier_id, order_id = %order_id, "simulation run started");
    }

    /// Stop and discard the courier's run. The stop flag is raised before
    /// the task is aborted, so a tick that already fired discards itself.
    pub fn stop(&self, courier_id: Uuid) -> bool {
        match self.runs.remove(&courier_id) {
            Some((_, handle)) => {
                handle.stopped.store(true, Ordering::SeqCst);
                handle.task.abort();
                self.metrics.active_runs.dec();
                info!(courier_id = %courier_id, "simulation run stopped");
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self, courier_id: Uuid) -> Option<TrackingSnapshot> {
        self.with_run(courier_id, |run| run.snapshot())
    }

    pub fn pause(&self, courier_id: Uuid) -> Option<TrackingSnapshot> {
        self.with_run(courier_id, |run| {
            run.pause();
            run.snapshot()
        })
    }

    pub fn resume(&self, courier_id: Uuid) -> Option<TrackingSnapshot> {
        self.with_run(courier_id, |run| {
            run.resume();
            run.snapshot()
        })
    }

    /// Force-complete the run and tear it down.
    pub fn skip_to_destination(&self, courier_id: Uuid) -> Option<TrackingSnapshot> {
        let snapshot = self.with_run(courier_id, |run| {
            run.skip_to_destination();
            run.snapshot()
        })?;
        self.stop(courier_id);
        Some(snapshot)
    }

    fn with_run<T>(&self, courier_id: Uuid, f: impl FnOnce(&mut SimRun) -> T) -> Option<T> {
        let entry = self.runs.get(&courier_id)?;
        let mut run = entry.sim.lock().expect("sim run lock poisoned");
        Some(f(&mut run))
    }

    /// Removal path for a run that finished on its own; guarded by run id
    /// so a replacement run for the same courier is never torn down.
    fn finish(&self, courier_id: Uuid, run_id: Uuid) {
        let removed = self
            .runs
            .remove_if(&courier_id, |_, handle| handle.run_id == run_id);
        if removed.is_some() {
            self.metrics.active_runs.dec();
        }
    }
}

async fn run_loop(
    sim: Arc<Mutex<SimRun>>,
    stopped: Arc<AtomicBool>,
    registry: RunRegistry,
    courier_id: Uuid,
    run_id: Uuid,
    snapshots_tx: broadcast::Sender<TrackingSnapshot>,
) {
    let period = sim.lock().expect("sim run lock poisoned").tick_interval();
    let mut ticker = tokio::time::interval(period);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if stopped.load(Ordering::SeqCst) {
            return;
        }

        let snapshot = {
            let mut run = sim.lock().expect("sim run lock poisoned");
            if !run.is_running() && !run.is_finished() {
                continue;
            }
            run.tick(Instant::now());
            run.snapshot()
        };

        let _ = snapshots_tx.send(snapshot.clone());

        if snapshot.phase == Phase::Arrived {
            registry.finish(courier_id, run_id);
            info!(
                courier_id = %courier_id,
                order_id = %snapshot.order_id,
                "simulation reached destination"
            );
            return;
        }
    }
}
