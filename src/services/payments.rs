//! Payment initiation use case.
//!
//! Turns a validated payment request into exactly one recorded transaction:
//! pending when the gateway accepted the STK push, failed when it declined
//! or was unreachable. The asynchronous callback later moves pending
//! transactions to their terminal status.

use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::Principal;
use crate::daraja::{PaymentGateway, StkPushRequest};
use crate::domain::{Transaction, TxKind};
use crate::error::AppError;
use crate::phone;
use crate::ports::TransactionStore;
use crate::validation::{
    validate_max_len, validate_phone, validate_positive_amount, DESCRIPTION_MAX_LEN,
};

/// Input for a payment initiation.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub phone: String,
    pub amount: BigDecimal,
    pub kind: TxKind,
    pub description: Option<String>,
    /// The user the transaction belongs to. `None` for registration-gated
    /// payments where no account exists yet.
    pub owner_id: Option<Uuid>,
}

/// Returned when the gateway accepted the prompt.
#[derive(Debug, Clone)]
pub struct PaymentAck {
    pub transaction_id: Uuid,
    pub checkout_ref: String,
    /// The gateway's customer-facing prompt message.
    pub customer_message: String,
}

pub struct PaymentInitiator {
    store: Arc<dyn TransactionStore>,
    gateway: Arc<dyn PaymentGateway>,
    country_code: String,
}

impl PaymentInitiator {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        gateway: Arc<dyn PaymentGateway>,
        country_code: String,
    ) -> Self {
        Self {
            store,
            gateway,
            country_code,
        }
    }

    /// Initiates a mobile-money charge on behalf of `principal`.
    ///
    /// Validation and auth failures reject immediately with no side
    /// effects. Past validation, every outcome records exactly one
    /// transaction: never zero, never two.
    pub async fn initiate(
        &self,
        principal: &Principal,
        request: PaymentRequest,
    ) -> Result<PaymentAck, AppError> {
        validate_phone("phone", &request.phone)?;
        validate_positive_amount("amount", &request.amount)?;
        if let Some(description) = &request.description {
            validate_max_len("description", description, DESCRIPTION_MAX_LEN)?;
        }

        let subscriber_id = phone::normalize(&request.phone, &self.country_code);
        let whole_units = floor_to_whole_units(&request.amount)?;
        let reference = mint_merchant_reference();
        let description = request
            .description
            .clone()
            .unwrap_or_else(|| request.kind.as_str().replace('_', " "));

        info!(
            initiator = %principal.user_id,
            subscriber = %subscriber_id,
            amount = whole_units,
            reference = %reference,
            "initiating STK push"
        );

        let push = StkPushRequest {
            subscriber_id,
            amount: whole_units,
            reference,
            description: description.clone(),
        };

        match self.gateway.stk_push(push).await {
            Ok(verdict) if verdict.is_accepted() => {
                let tx = Transaction::pending(
                    request.owner_id,
                    request.amount,
                    request.kind,
                    description,
                    verdict.merchant_request_id,
                    verdict.checkout_request_id.clone(),
                );
                self.store.create(&tx).await?;
                info!(transaction = %tx.id, "STK push accepted, transaction pending");
                Ok(PaymentAck {
                    transaction_id: tx.id,
                    checkout_ref: verdict.checkout_request_id,
                    customer_message: verdict.customer_message,
                })
            }
            Ok(verdict) => {
                let tx = Transaction::failed_at_initiation(
                    request.owner_id,
                    request.amount,
                    request.kind,
                    description,
                );
                self.store.create(&tx).await?;
                warn!(
                    transaction = %tx.id,
                    code = %verdict.response_code,
                    "gateway rejected STK push"
                );
                Err(AppError::GatewayRejected {
                    transaction_id: tx.id,
                    description: verdict.response_description,
                })
            }
            Err(err) => {
                let tx = Transaction::failed_at_initiation(
                    request.owner_id,
                    request.amount,
                    request.kind,
                    description,
                );
                self.store.create(&tx).await?;
                warn!(transaction = %tx.id, error = %err, "gateway unreachable");
                Err(AppError::GatewayUnavailable {
                    transaction_id: tx.id,
                })
            }
        }
    }
}

/// The gateway only takes whole currency units; fractions are dropped.
fn floor_to_whole_units(amount: &BigDecimal) -> Result<u64, AppError> {
    amount.to_u64().ok_or_else(|| {
        AppError::InvalidRequest(crate::validation::ValidationError::new(
            "amount",
            "exceeds the chargeable range",
        ))
    })
}

/// Merchant reference derived from the current time. Unique only down to
/// millisecond resolution, which holds at this call volume.
fn mint_merchant_reference() -> String {
    format!("PSG{}", Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn floors_fractional_amounts() {
        let amount = BigDecimal::from_str("10.99").unwrap();
        assert_eq!(floor_to_whole_units(&amount).unwrap(), 10);

        let amount = BigDecimal::from_str("1").unwrap();
        assert_eq!(floor_to_whole_units(&amount).unwrap(), 1);
    }

    #[test]
    fn merchant_reference_has_prefix_and_digits() {
        let reference = mint_merchant_reference();
        assert!(reference.starts_with("PSG"));
        assert!(reference[3..].chars().all(|ch| ch.is_ascii_digit()));
    }
}
