//! Payment-gated registration.
//!
//! An account is only created after the registration fee is confirmed. The
//! coordinator stores the profile as a draft keyed by the gating
//! transaction, and `status` promotes it exactly once when the transaction
//! completes, no matter how many clients are polling.

use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::{self, Principal};
use crate::domain::{Account, RegistrationDraft, RegistrationProfile, RegistrationStatus, TxKind, TxStatus};
use crate::error::AppError;
use crate::ports::{AccountStore, DraftStore, TransactionStore};
use crate::services::payments::{PaymentInitiator, PaymentRequest};
use crate::validation::{
    validate_email, validate_max_len, validate_phone, validate_required, FULL_NAME_MAX_LEN,
    ID_NUMBER_MAX_LEN,
};

/// Returned from `register`: the account does not exist yet, the caller is
/// expected to poll `status` with the transaction id.
#[derive(Debug, Clone)]
pub struct RegistrationAck {
    pub transaction_id: Uuid,
    /// Present when the gateway accepted the prompt; absent when initiation
    /// recorded an immediately-failed transaction.
    pub checkout_ref: Option<String>,
    pub customer_message: Option<String>,
}

pub struct RegistrationCoordinator {
    payments: Arc<PaymentInitiator>,
    transactions: Arc<dyn TransactionStore>,
    drafts: Arc<dyn DraftStore>,
    accounts: Arc<dyn AccountStore>,
    session_secret: String,
    registration_fee: bigdecimal::BigDecimal,
    draft_retention_hours: i64,
}

impl RegistrationCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        payments: Arc<PaymentInitiator>,
        transactions: Arc<dyn TransactionStore>,
        drafts: Arc<dyn DraftStore>,
        accounts: Arc<dyn AccountStore>,
        session_secret: String,
        registration_fee: bigdecimal::BigDecimal,
        draft_retention_hours: i64,
    ) -> Self {
        Self {
            payments,
            transactions,
            drafts,
            accounts,
            session_secret,
            registration_fee,
            draft_retention_hours,
        }
    }

    /// Registers a new member, gated on the registration fee. Validates the
    /// profile, initiates the fee payment against the member's phone, and
    /// persists a draft keyed by the created transaction. No account is
    /// created here.
    pub async fn register(
        &self,
        principal: &Principal,
        profile: RegistrationProfile,
    ) -> Result<RegistrationAck, AppError> {
        validate_profile(&profile)?;

        let request = PaymentRequest {
            phone: profile.phone.clone(),
            amount: self.registration_fee.clone(),
            kind: TxKind::RegistrationFee,
            description: Some(format!("registration fee for {}", profile.full_name)),
            owner_id: None,
        };

        // A gateway rejection or outage still records a failed transaction;
        // the draft is persisted against it either way so the status surface
        // can report payment_failed. Only validation/auth errors (no
        // transaction at all) abort without a draft.
        let (transaction_id, checkout_ref, customer_message) =
            match self.payments.initiate(principal, request).await {
                Ok(ack) => (
                    ack.transaction_id,
                    Some(ack.checkout_ref),
                    Some(ack.customer_message),
                ),
                Err(AppError::GatewayRejected { transaction_id, .. })
                | Err(AppError::GatewayUnavailable { transaction_id }) => {
                    (transaction_id, None, None)
                }
                Err(other) => return Err(other),
            };

        let draft =
            RegistrationDraft::new(transaction_id, profile, self.draft_retention_hours);
        self.drafts.create(&draft).await?;

        info!(transaction = %transaction_id, "registration draft stored, awaiting payment");
        Ok(RegistrationAck {
            transaction_id,
            checkout_ref,
            customer_message,
        })
    }

    /// Reports the registration-gated status for a transaction, promoting
    /// the draft on first sight of a completed payment.
    ///
    /// Idempotent: repeated calls after completion resolve to the same
    /// account and only ever create it once.
    pub async fn status(&self, transaction_id: Uuid) -> Result<RegistrationStatus, AppError> {
        let tx = self.transactions.get(transaction_id).await?;

        match tx.status {
            TxStatus::Pending => Ok(RegistrationStatus::PaymentPending),
            TxStatus::Failed => Ok(RegistrationStatus::PaymentFailed),
            TxStatus::Completed => self.promote_once(transaction_id).await,
        }
    }

    async fn promote_once(&self, transaction_id: Uuid) -> Result<RegistrationStatus, AppError> {
        // Fast path: a previous poll already promoted this draft.
        if let Some(account) = self
            .accounts
            .find_by_source_transaction(transaction_id)
            .await?
        {
            return Ok(self.completed(account));
        }

        if self.drafts.claim_for_promotion(transaction_id).await? {
            let draft = self.drafts.get(transaction_id).await?;
            let account = Account::from_draft(&draft.profile, transaction_id);

            if let Err(err) = self.accounts.insert(&account).await {
                // Money has moved but the account did not land. Surfaced
                // loudly for manual reconciliation; the claim stays held so
                // no retry can create a duplicate.
                error!(
                    transaction = %transaction_id,
                    error = %err,
                    "draft promotion failed after successful payment; manual reconciliation required"
                );
                return Err(AppError::PromotionFailed(transaction_id));
            }

            info!(
                transaction = %transaction_id,
                account = %account.id,
                "registration completed, account created"
            );
            return Ok(self.completed(account));
        }

        // Claim lost: either a concurrent poll just promoted (account
        // visible on re-check) or an earlier promotion attempt failed.
        match self
            .accounts
            .find_by_source_transaction(transaction_id)
            .await?
        {
            Some(account) => Ok(self.completed(account)),
            None => Err(AppError::PromotionFailed(transaction_id)),
        }
    }

    fn completed(&self, account: Account) -> RegistrationStatus {
        let token = auth::issue_token(&self.session_secret, account.id);
        RegistrationStatus::Completed {
            account_id: account.id,
            token,
        }
    }
}

fn validate_profile(profile: &RegistrationProfile) -> Result<(), AppError> {
    validate_required("full_name", &profile.full_name)?;
    validate_max_len("full_name", &profile.full_name, FULL_NAME_MAX_LEN)?;
    validate_phone("phone", &profile.phone)?;
    validate_email("email", &profile.email)?;
    validate_required("id_number", &profile.id_number)?;
    validate_max_len("id_number", &profile.id_number, ID_NUMBER_MAX_LEN)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> RegistrationProfile {
        RegistrationProfile {
            full_name: "Wanjiku Kamau".to_string(),
            phone: "0712345678".to_string(),
            email: "wanjiku@example.com".to_string(),
            id_number: "12345678".to_string(),
        }
    }

    #[test]
    fn accepts_a_complete_profile() {
        assert!(validate_profile(&profile()).is_ok());
    }

    #[test]
    fn rejects_missing_fields_naming_the_first() {
        let mut p = profile();
        p.full_name = "  ".to_string();
        let err = validate_profile(&p).unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidRequest(v) if v.field == "full_name"
        ));

        let mut p = profile();
        p.phone = "abc".to_string();
        let err = validate_profile(&p).unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidRequest(v) if v.field == "phone"
        ));

        let mut p = profile();
        p.email = "nope".to_string();
        let err = validate_profile(&p).unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidRequest(v) if v.field == "email"
        ));
    }
}
