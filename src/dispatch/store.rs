use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::courier::{
    Courier, CourierView, DeliveredLine, DeliveryRecord, GeoPoint, LocationFix,
};
use crate::models::order::{
    Customer, Delivery, FulfillmentMode, LineItem, Order, OrderStatus, TimelineEntry,
};

/// Authoritative in-memory registry of live orders and couriers.
///
/// Everything lives behind one mutex: an assignment or release mutates an
/// order and its courier together, and that pair flip has to be atomic.
/// Critical sections are short and never await, so contention stays cheap.
pub struct DispatchStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    orders: HashMap<Uuid, Order>,
    couriers: HashMap<Uuid, Courier>,
}

/// Outcome of `mark_delivered`; the order has already left the live set.
#[derive(Debug)]
pub struct DeliveryOutcome {
    pub courier: CourierView,
    pub order_id: Uuid,
    pub record: DeliveryRecord,
}

/// Outcome of `cancel_order`/`delete_order`: the courier released in the
/// same atomic step, if the order had one.
pub struct ReleaseOutcome {
    pub order: Order,
    pub released_courier: Option<Uuid>,
}

impl Default for DispatchStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("dispatch store lock poisoned")
    }

    pub fn counts(&self) -> (usize, usize) {
        let inner = self.lock();
        (inner.orders.len(), inner.couriers.len())
    }

    // ---- orders ----

    pub fn create_order(
        &self,
        lines: Vec<LineItem>,
        customer: Customer,
        delivery: Delivery,
        notes: String,
    ) -> Result<Order, AppError> {
        if lines.is_empty() {
            return Err(AppError::InvalidOrder("lines required".to_string()));
        }
        for line in &lines {
            if line.qty < 1 {
                return Err(AppError::InvalidOrder(format!(
                    "line {} has qty < 1",
                    line.id
                )));
            }
            if !(line.price >= 0.0) {
                return Err(AppError::InvalidOrder(format!(
                    "line {} has a negative price",
                    line.id
                )));
            }
        }
        if delivery.mode == FulfillmentMode::Delivery && delivery.address.is_none() {
            return Err(AppError::MissingDestination);
        }

        let amount = Order::compute_amount(&lines);
        let order = Order {
            id: Uuid::new_v4(),
            status: OrderStatus::Pending,
            customer,
            lines,
            delivery,
            notes,
            amount,
            assigned_courier: None,
            created_at: Utc::now(),
            timeline: vec![TimelineEntry {
                at: Utc::now(),
                event: "order_created".to_string(),
            }],
        };

        self.lock().orders.insert(order.id, order.clone());
        Ok(order)
    }

    /// Idempotent: a second call on a paid order succeeds without a
    /// duplicate timeline entry. Returns whether this call flipped it.
    pub fn mark_paid(&self, order_id: Uuid) -> Result<(Order, bool), AppError> {
        let mut inner = self.lock();
        let order = inner
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        match order.status {
            OrderStatus::Paid => Ok((order.clone(), false)),
            OrderStatus::Pending => {
                order.status = OrderStatus::Paid;
                order.timeline.push(TimelineEntry {
                    at: Utc::now(),
                    event: "payment_confirmed".to_string(),
                });
                Ok((order.clone(), true))
            }
            status => Err(AppError::InvalidTransition {
                order_id,
                status: status.as_str().to_string(),
            }),
        }
    }

    pub fn get_order(&self, order_id: Uuid) -> Result<Order, AppError> {
        self.lock()
            .orders
            .get(&order_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))
    }

    pub fn list_orders(&self, status: Option<OrderStatus>) -> Vec<Order> {
        let inner = self.lock();
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.created_at);
        orders
    }

    // ---- couriers ----

    pub fn register_courier(
        &self,
        name: String,
        phone: String,
        vehicle: String,
        plate: String,
    ) -> Result<CourierView, AppError> {
        if name.trim().is_empty() || phone.trim().is_empty() {
            return Err(AppError::InvalidCourier(
                "name and phone required".to_string(),
            ));
        }

        let courier = Courier {
            id: Uuid::new_v4(),
            name,
            phone,
            vehicle,
            plate,
            available: false,
            assigned_order: None,
            location: None,
            delivery_log: Vec::new(),
            last_update: Utc::now(),
        };

        self.lock().couriers.insert(courier.id, courier.clone());
        Ok(courier.into())
    }

    pub fn set_availability(
        &self,
        courier_id: Uuid,
        available: bool,
    ) -> Result<CourierView, AppError> {
        let mut inner = self.lock();
        let courier = inner
            .couriers
            .get_mut(&courier_id)
            .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;

        courier.available = available;
        courier.last_update = Utc::now();
        Ok(courier.clone().into())
    }

    pub fn update_location(
        &self,
        courier_id: Uuid,
        point: GeoPoint,
    ) -> Result<CourierView, AppError> {
        let mut inner = self.lock();
        let courier = inner
            .couriers
            .get_mut(&courier_id)
            .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;

        courier.location = Some(LocationFix {
            point,
            at: Utc::now(),
        });
        courier.last_update = Utc::now();
        Ok(courier.clone().into())
    }

    pub fn list_couriers(&self) -> Vec<CourierView> {
        let inner = self.lock();
        let mut couriers: Vec<CourierView> = inner
            .couriers
            .values()
            .cloned()
            .map(CourierView::from)
            .collect();
        couriers.sort_by_key(|c| c.courier.last_update);
        couriers
    }

    pub fn courier_log(&self, courier_id: Uuid) -> Result<Vec<DeliveryRecord>, AppError> {
        self.lock()
            .couriers
            .get(&courier_id)
            .map(|c| c.delivery_log.clone())
            .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))
    }

    // ---- dispatch transitions ----

    /// Bind one paid order to one free courier, flipping both in a single
    /// critical section. Returns the destination so the caller can start
    /// the simulation run.
    pub fn assign(
        &self,
        courier_id: Uuid,
        order_id: Uuid,
    ) -> Result<(CourierView, Order, GeoPoint), AppError> {
        let mut inner = self.lock();

        let courier = inner
            .couriers
            .get(&courier_id)
            .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;
        if courier.assigned_order.is_some() {
            return Err(AppError::CourierBusy(courier_id));
        }

        let order = inner
            .orders
            .get(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
        if order.assigned_courier.is_some() {
            return Err(AppError::OrderAlreadyAssigned(order_id));
        }
        if order.status != OrderStatus::Paid {
            return Err(AppError::InvalidTransition {
                order_id,
                status: order.status.as_str().to_string(),
            });
        }
        let destination = order
            .destination()
            .cloned()
            .ok_or(AppError::MissingDestination)?;

        // All gates passed; now both entities flip together.
        let order = inner
            .orders
            .get_mut(&order_id)
            .expect("order vanished inside critical section");
        order.status = OrderStatus::OnTheWay;
        order.assigned_courier = Some(courier_id);
        order.timeline.push(TimelineEntry {
            at: Utc::now(),
            event: format!("driver_assigned:{courier_id}"),
        });
        let order = order.clone();

        let courier = inner
            .couriers
            .get_mut(&courier_id)
            .expect("courier vanished inside critical section");
        courier.assigned_order = Some(order_id);
        courier.last_update = Utc::now();

        Ok((courier.clone().into(), order, destination))
    }

    /// Complete the courier's active delivery: archive it into the
    /// delivery log, release the courier, and drop the order from the
    /// live set. Orders vanish on delivery; only the courier log keeps
    /// the history.
    pub fn mark_delivered(
        &self,
        courier_id: Uuid,
        order_id: Option<Uuid>,
    ) -> Result<DeliveryOutcome, AppError> {
        let mut inner = self.lock();

        let courier = inner
            .couriers
            .get(&courier_id)
            .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;
        let order_id = order_id
            .or(courier.assigned_order)
            .ok_or(AppError::NoActiveAssignment)?;

        let order = inner
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
        order.status = OrderStatus::Delivered;
        order.timeline.push(TimelineEntry {
            at: Utc::now(),
            event: "delivered".to_string(),
        });

        let record = DeliveryRecord {
            order_id,
            delivered_at: Utc::now(),
            amount: order.amount,
            customer: order.customer.name.clone(),
            destination: order.delivery.address.as_ref().map(|a| a.label.clone()),
            lines: order
                .lines
                .iter()
                .map(|l| DeliveredLine {
                    id: l.id.clone(),
                    name: l.name.clone(),
                    qty: l.qty,
                    price: l.price,
                })
                .collect(),
        };

        inner.orders.remove(&order_id);

        let courier = inner
            .couriers
            .get_mut(&courier_id)
            .expect("courier vanished inside critical section");
        courier.delivery_log.push(record.clone());
        courier.assigned_order = None;
        courier.last_update = Utc::now();

        Ok(DeliveryOutcome {
            courier: courier.clone().into(),
            order_id,
            record,
        })
    }

    /// Terminal cancellation; the order stays listable as `cancelled`.
    pub fn cancel_order(&self, order_id: Uuid) -> Result<ReleaseOutcome, AppError> {
        let mut inner = self.lock();

        let order = inner
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
        if order.status.is_terminal() {
            return Err(AppError::InvalidTransition {
                order_id,
                status: order.status.as_str().to_string(),
            });
        }

        order.status = OrderStatus::Cancelled;
        let released_courier = order.assigned_courier.take();
        order.timeline.push(TimelineEntry {
            at: Utc::now(),
            event: "cancelled".to_string(),
        });
        let order = order.clone();

        release_courier(&mut inner, released_courier);

        Ok(ReleaseOutcome {
            order,
            released_courier,
        })
    }

    /// Administrative removal; releases any assigned courier in the same
    /// atomic step so no courier is left pointing at a dead order.
    pub fn delete_order(&self, order_id: Uuid) -> Result<ReleaseOutcome, AppError> {
        let mut inner = self.lock();

        let order = inner
            .orders
            .remove(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        let released_courier = order.assigned_courier;
        release_courier(&mut inner, released_courier);

        Ok(ReleaseOutcome {
            order,
            released_courier,
        })
    }
}

fn release_courier(inner: &mut Inner, courier_id: Option<Uuid>) {
    if let Some(id) = courier_id {
        if let Some(courier) = inner.couriers.get_mut(&id) {
            courier.assigned_order = None;
            courier.last_update = Utc::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::DispatchStore;
    use crate::error::AppError;
    use crate::models::courier::{CourierStatus, GeoPoint};
    use crate::models::order::{
        Customer, Delivery, DeliveryAddress, FulfillmentMode, LineItem, Order, OrderStatus,
    };

    fn line(id: &str, price: f64, qty: u32) -> LineItem {
        LineItem {
            id: id.to_string(),
            name: id.to_uppercase(),
            price,
            qty,
        }
    }

    fn delivery_to(lat: f64, lng: f64) -> Delivery {
        Delivery {
            mode: FulfillmentMode::Delivery,
            address: Some(DeliveryAddress {
                label: "12 Kloof St".to_string(),
                location: GeoPoint { lat, lng },
            }),
        }
    }

    fn collect() -> Delivery {
        Delivery {
            mode: FulfillmentMode::Collect,
            address: None,
        }
    }

    fn paid_delivery_order(store: &DispatchStore) -> Order {
        let order = store
            .create_order(
                vec![line("a", 50.0, 2), line("b", 30.0, 1)],
                Customer::default(),
                delivery_to(-33.93, 18.43),
                String::new(),
            )
            .unwrap();
        store.mark_paid(order.id).unwrap().0
    }

    fn idle_courier(store: &DispatchStore) -> Uuid {
        let view = store
            .register_courier(
                "Thandi".to_string(),
                "+27 82 000 0000".to_string(),
                "Bike".to_string(),
                "CA 123".to_string(),
            )
            .unwrap();
        store.set_availability(view.courier.id, true).unwrap();
        view.courier.id
    }

    #[test]
    fn amount_is_computed_from_lines() {
        let store = DispatchStore::new();
        let order = store
            .create_order(
                vec![line("a", 50.0, 2), line("b", 30.0, 1)],
                Customer::default(),
                collect(),
                String::new(),
            )
            .unwrap();

        assert_eq!(order.amount, 130.0);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.timeline.len(), 1);
        assert_eq!(order.timeline[0].event, "order_created");
    }

    #[test]
    fn empty_lines_are_rejected() {
        let store = DispatchStore::new();
        let err = store
            .create_order(Vec::new(), Customer::default(), collect(), String::new())
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOrder(_)));
    }

    #[test]
    fn zero_qty_and_negative_price_are_rejected() {
        let store = DispatchStore::new();
        let err = store
            .create_order(
                vec![line("a", 10.0, 0)],
                Customer::default(),
                collect(),
                String::new(),
            )
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOrder(_)));

        let err = store
            .create_order(
                vec![line("a", -1.0, 1)],
                Customer::default(),
                collect(),
                String::new(),
            )
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOrder(_)));
    }

    #[test]
    fn delivery_mode_requires_a_destination() {
        let store = DispatchStore::new();
        let err = store
            .create_order(
                vec![line("a", 10.0, 1)],
                Customer::default(),
                Delivery {
                    mode: FulfillmentMode::Delivery,
                    address: None,
                },
                String::new(),
            )
            .unwrap_err();
        assert!(matches!(err, AppError::MissingDestination));
    }

    #[test]
    fn mark_paid_is_idempotent() {
        let store = DispatchStore::new();
        let order = store
            .create_order(
                vec![line("a", 10.0, 1)],
                Customer::default(),
                collect(),
                String::new(),
            )
            .unwrap();

        let (first, flipped) = store.mark_paid(order.id).unwrap();
        assert!(flipped);
        assert_eq!(first.status, OrderStatus::Paid);

        let (second, flipped) = store.mark_paid(order.id).unwrap();
        assert!(!flipped);
        assert_eq!(second.status, OrderStatus::Paid);
        // order_created + exactly one payment_confirmed
        assert_eq!(second.timeline.len(), 2);
    }

    #[test]
    fn mark_paid_on_terminal_order_is_invalid() {
        let store = DispatchStore::new();
        let order = paid_delivery_order(&store);
        store.cancel_order(order.id).unwrap();

        let err = store.mark_paid(order.id).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[test]
    fn blank_courier_contact_is_rejected() {
        let store = DispatchStore::new();
        let err = store
            .register_courier(
                "  ".to_string(),
                "+27 82 000 0000".to_string(),
                String::new(),
                String::new(),
            )
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCourier(_)));
    }

    #[test]
    fn assign_flips_both_entities_atomically() {
        let store = DispatchStore::new();
        let order = paid_delivery_order(&store);
        let courier_id = idle_courier(&store);

        let (courier, order, destination) = store.assign(courier_id, order.id).unwrap();

        assert_eq!(order.status, OrderStatus::OnTheWay);
        assert_eq!(order.assigned_courier, Some(courier_id));
        assert_eq!(courier.status, CourierStatus::OnDelivery);
        assert_eq!(courier.courier.assigned_order, Some(order.id));
        assert_eq!(destination.lat, -33.93);
        assert!(
            order
                .timeline
                .iter()
                .any(|e| e.event == format!("driver_assigned:{courier_id}"))
        );
    }

    #[test]
    fn assign_requires_a_paid_order() {
        let store = DispatchStore::new();
        let order = store
            .create_order(
                vec![line("a", 10.0, 1)],
                Customer::default(),
                delivery_to(-33.93, 18.43),
                String::new(),
            )
            .unwrap();
        let courier_id = idle_courier(&store);

        let err = store.assign(courier_id, order.id).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[test]
    fn assign_rejects_collect_orders() {
        let store = DispatchStore::new();
        let order = store
            .create_order(
                vec![line("a", 10.0, 1)],
                Customer::default(),
                collect(),
                String::new(),
            )
            .unwrap();
        store.mark_paid(order.id).unwrap();
        let courier_id = idle_courier(&store);

        let err = store.assign(courier_id, order.id).unwrap_err();
        assert!(matches!(err, AppError::MissingDestination));
    }

    #[test]
    fn busy_courier_cannot_take_a_second_order() {
        let store = DispatchStore::new();
        let first = paid_delivery_order(&store);
        let second = paid_delivery_order(&store);
        let courier_id = idle_courier(&store);

        store.assign(courier_id, first.id).unwrap();
        let err = store.assign(courier_id, second.id).unwrap_err();
        assert!(matches!(err, AppError::CourierBusy(id) if id == courier_id));
    }

    #[test]
    fn assigned_order_cannot_be_assigned_again() {
        let store = DispatchStore::new();
        let order = paid_delivery_order(&store);
        let first = idle_courier(&store);
        let second = idle_courier(&store);

        store.assign(first, order.id).unwrap();
        let err = store.assign(second, order.id).unwrap_err();
        assert!(matches!(err, AppError::OrderAlreadyAssigned(id) if id == order.id));
    }

    #[test]
    fn delivery_archives_into_the_log_and_drops_the_order() {
        let store = DispatchStore::new();
        let order = paid_delivery_order(&store);
        let courier_id = idle_courier(&store);
        store.assign(courier_id, order.id).unwrap();

        let outcome = store.mark_delivered(courier_id, None).unwrap();

        assert_eq!(outcome.order_id, order.id);
        assert_eq!(outcome.record.amount, 130.0);
        assert_eq!(outcome.record.destination.as_deref(), Some("12 Kloof St"));
        assert_eq!(outcome.courier.status, CourierStatus::Idle);
        assert_eq!(outcome.courier.deliveries_count, 1);

        // The order is gone from the live set; only the log remembers it.
        assert!(matches!(
            store.get_order(order.id),
            Err(AppError::NotFound(_))
        ));
        assert!(store.list_orders(None).is_empty());
        assert_eq!(store.courier_log(courier_id).unwrap().len(), 1);
    }

    #[test]
    fn delivered_without_assignment_fails() {
        let store = DispatchStore::new();
        let courier_id = idle_courier(&store);

        let err = store.mark_delivered(courier_id, None).unwrap_err();
        assert!(matches!(err, AppError::NoActiveAssignment));
    }

    #[test]
    fn cancel_releases_the_courier_in_the_same_step() {
        let store = DispatchStore::new();
        let order = paid_delivery_order(&store);
        let courier_id = idle_courier(&store);
        store.assign(courier_id, order.id).unwrap();

        let outcome = store.cancel_order(order.id).unwrap();

        assert_eq!(outcome.order.status, OrderStatus::Cancelled);
        assert_eq!(outcome.released_courier, Some(courier_id));
        let couriers = store.list_couriers();
        assert_eq!(couriers[0].status, CourierStatus::Idle);
        // Cancelled orders stay listable.
        assert_eq!(store.list_orders(Some(OrderStatus::Cancelled)).len(), 1);
    }

    #[test]
    fn delete_releases_an_unavailable_courier_to_offline() {
        let store = DispatchStore::new();
        let order = paid_delivery_order(&store);
        let courier_id = idle_courier(&store);
        store.assign(courier_id, order.id).unwrap();
        store.set_availability(courier_id, false).unwrap();

        let outcome = store.delete_order(order.id).unwrap();

        assert_eq!(outcome.released_courier, Some(courier_id));
        assert_eq!(store.list_couriers()[0].status, CourierStatus::Offline);
        assert!(store.list_orders(None).is_empty());
    }

    #[test]
    fn at_most_one_order_references_each_courier() {
        let store = DispatchStore::new();
        let courier_id = idle_courier(&store);
        for _ in 0..3 {
            let order = paid_delivery_order(&store);
            let _ = store.assign(courier_id, order.id);
        }

        let referencing = store
            .list_orders(None)
            .iter()
            .filter(|o| o.assigned_courier == Some(courier_id))
            .count();
        assert_eq!(referencing, 1);
    }

    #[test]
    fn status_filter_matches_live_status() {
        let store = DispatchStore::new();
        let paid = paid_delivery_order(&store);
        store
            .create_order(
                vec![line("a", 10.0, 1)],
                Customer::default(),
                collect(),
                String::new(),
            )
            .unwrap();

        let listed = store.list_orders(Some(OrderStatus::Paid));
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, paid.id);
        assert_eq!(store.list_orders(None).len(), 2);
    }
}
