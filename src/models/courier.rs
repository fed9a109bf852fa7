use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Derived courier state. Never stored on the courier itself; always
/// recomputed from the availability flag and the active assignment, so the
/// two can't drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourierStatus {
    Offline,
    Idle,
    OnDelivery,
}

/// Last reported position fix for a courier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationFix {
    pub point: GeoPoint,
    pub at: DateTime<Utc>,
}

/// One completed delivery, archived on the courier when the order leaves
/// the live set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub order_id: Uuid,
    pub delivered_at: DateTime<Utc>,
    pub amount: f64,
    pub customer: String,
    pub destination: Option<String>,
    pub lines: Vec<DeliveredLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveredLine {
    pub id: String,
    pub name: String,
    pub qty: u32,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub vehicle: String,
    pub plate: String,
    pub available: bool,
    pub assigned_order: Option<Uuid>,
    pub location: Option<LocationFix>,
    pub delivery_log: Vec<DeliveryRecord>,
    pub last_update: DateTime<Utc>,
}

impl Courier {
    pub fn status(&self) -> CourierStatus {
        if self.assigned_order.is_some() {
            CourierStatus::OnDelivery
        } else if self.available {
            CourierStatus::Idle
        } else {
            CourierStatus::Offline
        }
    }
}

/// Read view returned by the API: the stored fields plus the derived
/// status and a delivery count, computed at read time.
#[derive(Debug, Clone, Serialize)]
pub struct CourierView {
    #[serde(flatten)]
    pub courier: Courier,
    pub status: CourierStatus,
    pub deliveries_count: usize,
}

impl From<Courier> for CourierView {
    fn from(courier: Courier) -> Self {
        let status = courier.status();
        let deliveries_count = courier.delivery_log.len();
        Self {
            courier,
            status,
            deliveries_count,
        }
    }
}
