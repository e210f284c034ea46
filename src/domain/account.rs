//! Member account entity, created by draft promotion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::registration::RegistrationProfile;

/// A persisted member account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub id_number: String,
    /// The completed transaction that paid for this registration. Unique,
    /// so repeated status polls resolve to the same account.
    pub source_transaction_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn from_draft(profile: &RegistrationProfile, source_transaction_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            full_name: profile.full_name.clone(),
            phone: profile.phone.clone(),
            email: profile.email.clone(),
            id_number: profile.id_number.clone(),
            source_transaction_id,
            created_at: Utc::now(),
        }
    }
}
