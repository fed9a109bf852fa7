use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::dispatch::service;
use crate::error::AppError;
use crate::models::courier::{CourierView, GeoPoint};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers", post(register_courier).get(list_couriers))
        .route("/couriers/:id/availability", post(set_availability))
        .route("/couriers/:id/location", post(update_location))
        .route("/couriers/:id/assign", post(assign))
        .route("/couriers/:id/delivered", post(mark_delivered))
        .route("/couriers/:id/log", get(delivery_log))
}

#[derive(Deserialize)]
pub struct RegisterCourierRequest {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub vehicle: Option<String>,
    #[serde(default)]
    pub plate: Option<String>,
}

#[derive(Deserialize)]
pub struct SetAvailabilityRequest {
    pub available: bool,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub order_id: Uuid,
}

#[derive(Deserialize, Default)]
pub struct MarkDeliveredRequest {
    #[serde(default)]
    pub order_id: Option<Uuid>,
}

async fn register_courier(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterCourierRequest>,
) -> Result<Json<CourierView>, AppError> {
    let courier = service::register_courier(
        &state,
        payload.name,
        payload.phone,
        payload.vehicle.unwrap_or_default(),
        payload.plate.unwrap_or_default(),
    )?;
    Ok(Json(courier))
}

async fn list_couriers(State(state): State<Arc<AppState>>) -> Json<Vec<CourierView>> {
    Json(state.store.list_couriers())
}

async fn set_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetAvailabilityRequest>,
) -> Result<Json<CourierView>, AppError> {
    Ok(Json(state.store.set_availability(id, payload.available)?))
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<CourierView>, AppError> {
    let point = GeoPoint {
        lat: payload.lat,
        lng: payload.lng,
    };
    Ok(Json(service::update_location(&state, id, point)?))
}

async fn assign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<Value>, AppError> {
    let (courier, order) = service::assign(&state, id, payload.order_id)?;
    Ok(Json(json!({
        "courier": courier,
        "order": order,
    })))
}

async fn mark_delivered(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MarkDeliveredRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = service::mark_delivered(&state, id, payload.order_id)?;
    Ok(Json(json!({
        "delivered": true,
        "removed_order_id": outcome.order_id,
        "courier": outcome.courier,
        "record": outcome.record,
    })))
}

async fn delivery_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let log = state.store.courier_log(id)?;
    Ok(Json(json!({
        "courier_id": id,
        "log": log,
    })))
}
