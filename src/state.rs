use tokio::sync::broadcast;

use crate::dispatch::store::DispatchStore;
use crate::models::courier::GeoPoint;
use crate::models::events::OrderEvent;
use crate::observability::metrics::Metrics;
use crate::sim::registry::RunRegistry;
use crate::sim::{SimSettings, TrackingSnapshot};

pub struct AppState {
    pub store: DispatchStore,
    pub runs: RunRegistry,
    /// Fixed origin every delivery run starts from.
    pub merchant: GeoPoint,
    pub sim: SimSettings,
    pub order_events_tx: broadcast::Sender<OrderEvent>,
    pub snapshots_tx: broadcast::Sender<TrackingSnapshot>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        merchant: GeoPoint,
        sim: SimSettings,
        event_buffer_size: usize,
    ) -> (Self, broadcast::Receiver<OrderEvent>) {
        let (order_events_tx, order_events_rx) = broadcast::channel(event_buffer_size);
        let (snapshots_tx, _unused_rx) = broadcast::channel(event_buffer_size);
        let metrics = Metrics::new();

        (
            Self {
                store: DispatchStore::new(),
                runs: RunRegistry::new(metrics.clone()),
                merchant,
                sim,
                order_events_tx,
                snapshots_tx,
                metrics,
            },
            order_events_rx,
        )
    }
}
