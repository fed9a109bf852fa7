use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::courier::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    OnTheWay,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::OnTheWay => "on_the_way",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentMode {
    Delivery,
    Collect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub qty: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Default for Customer {
    fn default() -> Self {
        Self {
            name: "Guest".to_string(),
            phone: None,
        }
    }
}

/// Destination as resolved by the geocoding collaborator; this core never
/// geocodes text itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub label: String,
    pub location: GeoPoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub mode: FulfillmentMode,
    #[serde(default)]
    pub address: Option<DeliveryAddress>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub at: DateTime<Utc>,
    pub event: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub status: OrderStatus,
    pub customer: Customer,
    pub lines: Vec<LineItem>,
    pub delivery: Delivery,
    pub notes: String,
    /// Always recomputed from the lines at creation; a client-supplied
    /// total is never trusted.
    pub amount: f64,
    pub assigned_courier: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub timeline: Vec<TimelineEntry>,
}

impl Order {
    pub fn compute_amount(lines: &[LineItem]) -> f64 {
        lines.iter().map(|l| l.price * f64::from(l.qty)).sum()
    }

    /// Destination coordinate, present only for delivery-mode orders with
    /// a resolved address.
    pub fn destination(&self) -> Option<&GeoPoint> {
        match self.delivery.mode {
            FulfillmentMode::Delivery => self.delivery.address.as_ref().map(|a| &a.location),
            FulfillmentMode::Collect => None,
        }
    }
}
