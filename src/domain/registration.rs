//! Registration draft entity and the registration-facing status union.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Profile fields captured at registration time, held until the gating
/// payment resolves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationProfile {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub id_number: String,
}

/// Ephemeral association between a gating transaction and a not-yet-persisted
/// member profile. Keyed by the transaction id, consumed at most once.
#[derive(Debug, Clone)]
pub struct RegistrationDraft {
    pub transaction_id: Uuid,
    pub profile: RegistrationProfile,
    /// Promotion marker. Flipped exactly once by the store's check-and-set;
    /// a flipped marker means an account creation was attempted.
    pub promoted: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RegistrationDraft {
    pub fn new(transaction_id: Uuid, profile: RegistrationProfile, retention_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            transaction_id,
            profile,
            promoted: false,
            created_at: now,
            expires_at: now + Duration::hours(retention_hours),
        }
    }
}

/// Registration-gated status surface, as reported to polling clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationStatus {
    /// The gating payment has not resolved yet.
    PaymentPending,
    /// The gating payment failed; the draft will not be promoted.
    PaymentFailed,
    /// The payment completed and the draft was promoted into an account.
    /// Carries a session credential for the new member.
    Completed { account_id: Uuid, token: String },
}

impl RegistrationStatus {
    pub fn is_terminal(&self) -> bool {
        match self {
            RegistrationStatus::PaymentPending => false,
            RegistrationStatus::PaymentFailed | RegistrationStatus::Completed { .. } => true,
        }
    }
}
