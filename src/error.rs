use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::ports::StoreError;
use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The gateway explicitly declined the charge. The failed transaction
    /// recorded for the attempt rides along.
    #[error("Payment rejected by gateway: {description}")]
    GatewayRejected {
        transaction_id: Uuid,
        description: String,
    },

    /// Transport or infrastructure failure talking to the gateway. A failed
    /// transaction was still recorded for the attempt.
    #[error("Payment gateway unavailable")]
    GatewayUnavailable { transaction_id: Uuid },

    /// Terminal status written over another terminal status. Internal;
    /// callers on the callback path translate duplicates into an ack.
    #[error("Transaction {0} is already finalized")]
    InvalidTransition(Uuid),

    /// Payment succeeded but account creation did not. Money has moved, so
    /// this is surfaced loudly and remediated manually.
    #[error("Registration promotion failed for transaction {0}")]
    PromotionFailed(Uuid),

    #[error("Database error: {0}")]
    Database(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::GatewayRejected { .. } => StatusCode::PAYMENT_REQUIRED,
            AppError::GatewayUnavailable { .. } => StatusCode::BAD_GATEWAY,
            AppError::InvalidTransition(_) => StatusCode::CONFLICT,
            AppError::PromotionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Transaction recorded for the failed attempt, when there is one.
    fn transaction_id(&self) -> Option<Uuid> {
        match self {
            AppError::GatewayRejected { transaction_id, .. }
            | AppError::GatewayUnavailable { transaction_id }
            | AppError::PromotionFailed(transaction_id) => Some(*transaction_id),
            _ => None,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AppError::NotFound(what),
            StoreError::InvalidTransition(id) => AppError::InvalidTransition(id),
            StoreError::Conflict(what) => AppError::Database(format!("conflict: {}", what)),
            StoreError::Backend(msg) => AppError::Database(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });
        if let Some(tx_id) = self.transaction_id() {
            body["transaction_id"] = json!(tx_id.to_string());
        }

        (status, Json(body)).into_response()
    }
}
