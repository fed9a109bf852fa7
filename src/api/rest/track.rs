use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use uuid::Uuid;

use crate::error::AppError;
use crate::sim::TrackingSnapshot;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/track/:courier_id", get(snapshot))
        .route("/track/:courier_id/pause", post(pause))
        .route("/track/:courier_id/resume", post(resume))
        .route("/track/:courier_id/skip", post(skip))
}

fn no_active_run(courier_id: Uuid) -> AppError {
    AppError::NotFound(format!("no active delivery for courier {courier_id}"))
}

async fn snapshot(
    State(state): State<Arc<AppState>>,
    Path(courier_id): Path<Uuid>,
) -> Result<Json<TrackingSnapshot>, AppError> {
    state
        .runs
        .snapshot(courier_id)
        .map(Json)
        .ok_or_else(|| no_active_run(courier_id))
}

async fn pause(
    State(state): State<Arc<AppState>>,
    Path(courier_id): Path<Uuid>,
) -> Result<Json<TrackingSnapshot>, AppError> {
    state
        .runs
        .pause(courier_id)
        .map(Json)
        .ok_or_else(|| no_active_run(courier_id))
}

async fn resume(
    State(state): State<Arc<AppState>>,
    Path(courier_id): Path<Uuid>,
) -> Result<Json<TrackingSnapshot>, AppError> {
    state
        .runs
        .resume(courier_id)
        .map(Json)
        .ok_or_else(|| no_active_run(courier_id))
}

/// Administrative override: jump the run straight to the drop-off. The
/// final snapshot is pushed to the feed before the run is torn down.
async fn skip(
    State(state): State<Arc<AppState>>,
    Path(courier_id): Path<Uuid>,
) -> Result<Json<TrackingSnapshot>, AppError> {
    let snapshot = state
        .runs
        .skip_to_destination(courier_id)
        .ok_or_else(|| no_active_run(courier_id))?;

    let _ = state.snapshots_tx.send(snapshot.clone());
    Ok(Json(snapshot))
}
