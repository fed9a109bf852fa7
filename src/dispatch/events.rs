use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::models::events::OrderEvent;

/// Stand-in for the notification collaborator: logs every timeline event
/// as it is appended. Runs until the event channel closes.
pub async fn run_event_log(mut rx: broadcast::Receiver<OrderEvent>) {
    info!("timeline event log started");

    loop {
        match rx.recv().await {
            Ok(event) => {
                info!(order_id = %event.order_id, event = %event.event, "timeline event");
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "timeline event log lagged behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }

    warn!("timeline event log stopped: channel closed");
}
