use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("invalid courier: {0}")]
    InvalidCourier(String),

    #[error("delivery order has no resolved destination coordinate")]
    MissingDestination,

    #[error("invalid transition: order {order_id} is {status}")]
    InvalidTransition { order_id: Uuid, status: String },

    #[error("order {0} already has an assigned courier")]
    OrderAlreadyAssigned(Uuid),

    #[error("courier {0} already has an active delivery")]
    CourierBusy(Uuid),

    #[error("courier has no active assignment")]
    NoActiveAssignment,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable tag so collaborators can branch on the
    /// condition without parsing message text.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::InvalidOrder(_) => "invalid_order",
            AppError::InvalidCourier(_) => "invalid_courier",
            AppError::MissingDestination => "missing_destination",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::OrderAlreadyAssigned(_) => "order_already_assigned",
            AppError::CourierBusy(_) => "courier_busy",
            AppError::NoActiveAssignment => "no_active_assignment",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidOrder(_)
            | AppError::InvalidCourier(_)
            | AppError::MissingDestination
            | AppError::NoActiveAssignment => StatusCode::BAD_REQUEST,
            AppError::InvalidTransition { .. }
            | AppError::OrderAlreadyAssigned(_)
            | AppError::CourierBusy(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}
