use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::dispatch::store::{DeliveryOutcome, ReleaseOutcome};
use crate::error::AppError;
use crate::geo::route::build_route;
use crate::models::courier::{CourierView, GeoPoint};
use crate::models::events::OrderEvent;
use crate::models::order::{Customer, Delivery, LineItem, Order};
use crate::state::AppState;

/// Orchestration over the store: every mutation goes through here so the
/// timeline event fan-out, metrics, and simulation runs stay in step with
/// the registry. Reads go straight to the store.

pub fn create_order(
    state: &Arc<AppState>,
    lines: Vec<LineItem>,
    customer: Customer,
    delivery: Delivery,
    notes: String,
) -> Result<Order, AppError> {
    let order = state.store.create_order(lines, customer, delivery, notes)?;

    state.metrics.orders_created_total.inc();
    emit(state, OrderEvent::new(order.id, "order_created"));
    info!(order_id = %order.id, amount = order.amount, "order created");
    Ok(order)
}

pub fn mark_paid(state: &Arc<AppState>, order_id: Uuid) -> Result<Order, AppError> {
    let (order, newly_paid) = state.store.mark_paid(order_id)?;
    if newly_paid {
        emit(state, OrderEvent::new(order.id, "payment_confirmed"));
        info!(order_id = %order.id, "payment confirmed");
    }
    Ok(order)
}

pub fn register_courier(
    state: &Arc<AppState>,
    name: String,
    phone: String,
    vehicle: String,
    plate: String,
) -> Result<CourierView, AppError> {
    let courier = state.store.register_courier(name, phone, vehicle, plate)?;
    info!(courier_id = %courier.courier.id, name = %courier.courier.name, "courier registered");
    Ok(courier)
}

/// Bind the order to the courier and start its simulation run. This is
/// the single place a run is ever started from.
pub fn assign(
    state: &Arc<AppState>,
    courier_id: Uuid,
    order_id: Uuid,
) -> Result<(CourierView, Order), AppError> {
    let (courier, order, destination) = match state.store.assign(courier_id, order_id) {
        Ok(result) => result,
        Err(err) => {
            state
                .metrics
                .assignments_total
                .with_label_values(&["error"])
                .inc();
            return Err(err);
        }
    };

    let route = build_route(&state.merchant, &destination);
    state.runs.start(
        courier_id,
        order_id,
        route,
        &state.sim,
        state.snapshots_tx.clone(),
    );

    state
        .metrics
        .assignments_total
        .with_label_values(&["success"])
        .inc();
    emit(
        state,
        OrderEvent::new(order_id, format!("driver_assigned:{courier_id}")),
    );
    info!(order_id = %order_id, courier_id = %courier_id, "order assigned");

    Ok((courier, order))
}

pub fn mark_delivered(
    state: &Arc<AppState>,
    courier_id: Uuid,
    order_id: Option<Uuid>,
) -> Result<DeliveryOutcome, AppError> {
    let outcome = state.store.mark_delivered(courier_id, order_id)?;

    state.runs.stop(courier_id);
    state.metrics.orders_delivered_total.inc();
    emit(state, OrderEvent::new(outcome.order_id, "delivered"));
    info!(
        order_id = %outcome.order_id,
        courier_id = %courier_id,
        amount = outcome.record.amount,
        "order delivered"
    );

    Ok(outcome)
}

pub fn cancel_order(state: &Arc<AppState>, order_id: Uuid) -> Result<Order, AppError> {
    let ReleaseOutcome {
        order,
        released_courier,
    } = state.store.cancel_order(order_id)?;

    if let Some(courier_id) = released_courier {
        state.runs.stop(courier_id);
    }
    emit(state, OrderEvent::new(order_id, "cancelled"));
    info!(order_id = %order_id, released_courier = ?released_courier, "order cancelled");

    Ok(order)
}

pub fn delete_order(state: &Arc<AppState>, order_id: Uuid) -> Result<ReleaseOutcome, AppError> {
    let outcome = state.store.delete_order(order_id)?;

    if let Some(courier_id) = outcome.released_courier {
        state.runs.stop(courier_id);
    }
    info!(order_id = %order_id, "order deleted");

    Ok(outcome)
}

pub fn update_location(
    state: &Arc<AppState>,
    courier_id: Uuid,
    point: GeoPoint,
) -> Result<CourierView, AppError> {
    state.store.update_location(courier_id, point)
}

fn emit(state: &Arc<AppState>, event: OrderEvent) {
    // No subscribers is fine; the channel only fans out to observers.
    let _ = state.order_events_tx.send(event);
}
