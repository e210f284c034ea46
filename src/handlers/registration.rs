use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Principal;
use crate::domain::{RegistrationProfile, RegistrationStatus};
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub id_number: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub status: &'static str,
    pub transaction_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_message: Option<String>,
}

/// `POST /register`: starts a payment-gated registration. The member
/// account is not created here; callers poll
/// `GET /register/:transaction_id/status` until the gating payment
/// resolves.
pub async fn register(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, AppError> {
    let profile = RegistrationProfile {
        full_name: body.full_name,
        phone: body.phone,
        email: body.email,
        id_number: body.id_number,
    };

    let ack = state.registration.register(&principal, profile).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(RegisterResponse {
            status: "payment_initiated",
            transaction_id: ack.transaction_id,
            checkout_ref: ack.checkout_ref,
            customer_message: ack.customer_message,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct RegistrationStatusResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// `GET /register/:transaction_id/status`: registration-gated status.
/// The first call that observes a completed payment promotes the draft;
/// repeated calls are idempotent and re-issue a credential.
pub async fn registration_status(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let status = state.registration.status(transaction_id).await?;

    let response = match status {
        RegistrationStatus::PaymentPending => RegistrationStatusResponse {
            status: "payment_pending",
            account_id: None,
            token: None,
        },
        RegistrationStatus::PaymentFailed => RegistrationStatusResponse {
            status: "payment_failed",
            account_id: None,
            token: None,
        },
        RegistrationStatus::Completed { account_id, token } => RegistrationStatusResponse {
            status: "registration_completed",
            account_id: Some(account_id),
            token: Some(token),
        },
    };

    Ok(Json(response))
}
