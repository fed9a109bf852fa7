use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Timeline event fanned out to the notification side as it is appended
/// to an order. The `event` string matches the order timeline verbatim
/// (`order_created`, `payment_confirmed`, `driver_assigned:<id>`,
/// `delivered`, `cancelled`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    pub order_id: Uuid,
    pub at: DateTime<Utc>,
    pub event: String,
}

impl OrderEvent {
    pub fn new(order_id: Uuid, event: impl Into<String>) -> Self {
        Self {
            order_id,
            at: Utc::now(),
            event: event.into(),
        }
    }
}
