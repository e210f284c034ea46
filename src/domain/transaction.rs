//! Transaction domain entity.
//! Framework-agnostic record of a single payment attempt and its lifecycle.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a payment attempt.
///
/// `Pending` is the only non-terminal value. A transaction moves
/// `Pending -> Completed` or `Pending -> Failed` exactly once; stores
/// reject any write over a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Completed,
    Failed,
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TxStatus::Completed | TxStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Completed => "completed",
            TxStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TxStatus::Pending),
            "completed" => Some(TxStatus::Completed),
            "failed" => Some(TxStatus::Failed),
            _ => None,
        }
    }
}

/// Semantic purpose of a transaction, independent of its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    Credit,
    Contribution,
    RegistrationFee,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Credit => "credit",
            TxKind::Contribution => "contribution",
            TxKind::RegistrationFee => "registration_fee",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "credit" => Some(TxKind::Credit),
            "contribution" => Some(TxKind::Contribution),
            "registration_fee" => Some(TxKind::RegistrationFee),
            _ => None,
        }
    }
}

/// Domain entity representing a payment attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    /// Owning user. `None` when the payment precedes account creation
    /// (registration-gated flow).
    pub owner_id: Option<Uuid>,
    pub amount: BigDecimal,
    pub kind: TxKind,
    pub status: TxStatus,
    /// Gateway correlation refs, set once the gateway accepted the prompt.
    pub merchant_ref: Option<String>,
    pub checkout_ref: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// New pending transaction awaiting the gateway's verdict.
    pub fn pending(
        owner_id: Option<Uuid>,
        amount: BigDecimal,
        kind: TxKind,
        description: String,
        merchant_ref: String,
        checkout_ref: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            amount,
            kind,
            status: TxStatus::Pending,
            merchant_ref: Some(merchant_ref),
            checkout_ref: Some(checkout_ref),
            description,
            created_at: now,
            updated_at: now,
        }
    }

    /// New transaction that failed at initiation: the gateway declined or
    /// was unreachable. Recorded so every initiation attempt leaves exactly
    /// one row behind.
    pub fn failed_at_initiation(
        owner_id: Option<Uuid>,
        amount: BigDecimal,
        kind: TxKind,
        description: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            amount,
            kind,
            status: TxStatus::Failed,
            merchant_ref: None,
            checkout_ref: None,
            description,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_constructor_stamps_refs_and_status() {
        let tx = Transaction::pending(
            None,
            BigDecimal::from(1),
            TxKind::RegistrationFee,
            "registration fee".to_string(),
            "PSG1".to_string(),
            "ws_CO_1".to_string(),
        );
        assert_eq!(tx.status, TxStatus::Pending);
        assert_eq!(tx.merchant_ref.as_deref(), Some("PSG1"));
        assert_eq!(tx.checkout_ref.as_deref(), Some("ws_CO_1"));
        assert!(tx.owner_id.is_none());
    }

    #[test]
    fn failed_constructor_has_no_gateway_refs() {
        let tx = Transaction::failed_at_initiation(
            Some(Uuid::new_v4()),
            BigDecimal::from(100),
            TxKind::Contribution,
            "contribution".to_string(),
        );
        assert_eq!(tx.status, TxStatus::Failed);
        assert!(tx.merchant_ref.is_none());
        assert!(tx.checkout_ref.is_none());
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [TxStatus::Pending, TxStatus::Completed, TxStatus::Failed] {
            assert_eq!(TxStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TxStatus::parse("unknown"), None);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!TxStatus::Pending.is_terminal());
        assert!(TxStatus::Completed.is_terminal());
        assert!(TxStatus::Failed.is_terminal());
    }
}
