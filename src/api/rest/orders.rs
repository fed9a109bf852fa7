use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::dispatch::service;
use crate::error::AppError;
use crate::models::order::{Customer, Delivery, FulfillmentMode, LineItem, Order, OrderStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/:id", get(get_order).delete(delete_order))
        .route("/orders/:id/paid", post(mark_paid))
        .route("/orders/:id/cancel", post(cancel_order))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub lines: Vec<LineItem>,
    #[serde(default)]
    pub customer: Option<Customer>,
    #[serde(default)]
    pub delivery: Option<Delivery>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct ListOrdersParams {
    pub status: Option<OrderStatus>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    let delivery = payload.delivery.unwrap_or(Delivery {
        mode: FulfillmentMode::Collect,
        address: None,
    });

    let order = service::create_order(
        &state,
        payload.lines,
        payload.customer.unwrap_or_default(),
        delivery,
        payload.notes.unwrap_or_default(),
    )?;

    Ok(Json(order))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListOrdersParams>,
) -> Json<Vec<Order>> {
    Json(state.store.list_orders(params.status))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.store.get_order(id)?))
}

async fn mark_paid(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(service::mark_paid(&state, id)?))
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(service::cancel_order(&state, id)?))
}

async fn delete_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let outcome = service::delete_order(&state, id)?;
    Ok(Json(json!({
        "order_id": id,
        "removed": true,
        "released_courier": outcome.released_courier,
    })))
}
