//! Gateway callback: the asynchronous half of the two-phase confirmation.
//!
//! The gateway posts the final verdict for an earlier STK push, correlated
//! by the checkout ref returned at initiation. This is the only writer of
//! terminal transaction statuses; the store rejects everything past the
//! first terminal write, so duplicate deliveries are acknowledged without
//! effect.

use axum::{
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use tracing::{info, warn};

use crate::domain::TxStatus;
use crate::error::AppError;
use crate::ports::{GatewayRefs, StoreError};
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Gateway-Signature";

/// Verdict code the gateway sends for a successfully charged prompt.
const RESULT_SUCCESS: i64 = 0;

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackPayload {
    pub merchant_request_id: String,
    pub checkout_request_id: String,
    pub result_code: i64,
    pub result_desc: String,
}

impl CallbackPayload {
    /// Canonical string the callback signature is computed over.
    pub fn canonical_string(&self) -> String {
        format!(
            "{}:{}:{}",
            self.merchant_request_id, self.checkout_request_id, self.result_code
        )
    }
}

/// Computes the hex HMAC signature for a payload. Shared with tests and
/// any tooling that replays callbacks.
pub fn sign_callback(secret: &str, payload: &CallbackPayload) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(payload.canonical_string().as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn verify_signature(
    secret: &str,
    payload: &CallbackPayload,
    headers: &HeaderMap,
) -> Result<(), AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthenticated("missing callback signature".to_string()))?;

    let expected = hex::decode(signature)
        .map_err(|_| AppError::Unauthenticated("malformed callback signature".to_string()))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Unauthenticated("invalid callback secret".to_string()))?;
    mac.update(payload.canonical_string().as_bytes());
    mac.verify_slice(&expected)
        .map_err(|_| AppError::Unauthenticated("callback signature mismatch".to_string()))
}

/// `POST /callback`: applies the gateway's terminal verdict to the
/// matching transaction.
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CallbackPayload>,
) -> Result<impl IntoResponse, AppError> {
    verify_signature(&state.config.callback_secret, &payload, &headers)?;

    let tx = state
        .transactions
        .find_by_checkout_ref(&payload.checkout_request_id)
        .await?;

    let terminal = if payload.result_code == RESULT_SUCCESS {
        TxStatus::Completed
    } else {
        TxStatus::Failed
    };

    let refs = GatewayRefs {
        merchant_ref: payload.merchant_request_id.clone(),
        checkout_ref: payload.checkout_request_id.clone(),
    };

    match state.transactions.set_terminal(tx.id, terminal, Some(refs)).await {
        Ok(()) => {
            info!(
                transaction = %tx.id,
                status = terminal.as_str(),
                code = payload.result_code,
                "callback applied terminal status"
            );
            Ok(Json(json!({ "status": "ok", "transaction_id": tx.id })))
        }
        // Duplicate delivery: the verdict already landed. Acknowledge so
        // the gateway's retry loop stops.
        Err(StoreError::InvalidTransition(_)) => {
            warn!(transaction = %tx.id, "duplicate callback ignored");
            Ok(Json(json!({ "status": "already_finalized", "transaction_id": tx.id })))
        }
        Err(err) => Err(err.into()),
    }
}
