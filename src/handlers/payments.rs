use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Principal;
use crate::domain::{TxKind, TxStatus};
use crate::error::AppError;
use crate::services::payments::PaymentRequest;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct InitiatePaymentBody {
    pub phone: String,
    pub amount: BigDecimal,
    #[serde(default = "default_kind")]
    pub kind: TxKind,
    pub description: Option<String>,
}

fn default_kind() -> TxKind {
    TxKind::Contribution
}

#[derive(Debug, Serialize)]
pub struct InitiatePaymentResponse {
    pub transaction_id: Uuid,
    pub checkout_ref: String,
    pub customer_message: String,
}

/// `POST /payments`: initiates an STK push charge for the authenticated
/// member. The charge confirms asynchronously; callers poll
/// `GET /payments/:id` for the verdict.
pub async fn initiate_payment(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<InitiatePaymentBody>,
) -> Result<impl IntoResponse, AppError> {
    let request = PaymentRequest {
        phone: body.phone,
        amount: body.amount,
        kind: body.kind,
        description: body.description,
        owner_id: Some(principal.user_id),
    };

    let ack = state.payments.initiate(&principal, request).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(InitiatePaymentResponse {
            transaction_id: ack.transaction_id,
            checkout_ref: ack.checkout_ref,
            customer_message: ack.customer_message,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    pub transaction_id: Uuid,
    pub status: TxStatus,
}

/// `GET /payments/:id`: raw payment status for a transaction.
pub async fn payment_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let tx = state.transactions.get(id).await?;

    Ok(Json(PaymentStatusResponse {
        transaction_id: tx.id,
        status: tx.status,
    }))
}
