//! Store traits the core depends on. The service layer only ever sees these
//! contracts; Postgres and in-memory implementations live in `adapters`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Account, RegistrationDraft, Transaction, TxStatus};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    /// Attempted terminal write over a status that is already terminal.
    /// Only the first terminal write for a given transaction succeeds.
    #[error("invalid status transition for transaction {0}")]
    InvalidTransition(Uuid),

    /// Uniqueness constraint violation.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Gateway correlation refs attached alongside a terminal write when the
/// callback supplies them.
#[derive(Debug, Clone)]
pub struct GatewayRefs {
    pub merchant_ref: String,
    pub checkout_ref: String,
}

/// Durable record of payment attempts. The status field is owned
/// exclusively by this store: written `pending`/`failed` once at creation
/// and moved to a terminal value at most once afterward.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn create(&self, tx: &Transaction) -> StoreResult<()>;

    async fn get(&self, id: Uuid) -> StoreResult<Transaction>;

    /// Writes a terminal status. Serializes concurrent terminal writes for
    /// the same id: the first wins, later ones observe `InvalidTransition`.
    /// Passing a non-terminal status is a caller bug and is rejected the
    /// same way.
    async fn set_terminal(
        &self,
        id: Uuid,
        status: TxStatus,
        refs: Option<GatewayRefs>,
    ) -> StoreResult<()>;

    /// Locates the transaction a gateway callback refers to.
    async fn find_by_checkout_ref(&self, checkout_ref: &str) -> StoreResult<Transaction>;
}

/// Pending registration payloads, keyed by their gating transaction.
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn create(&self, draft: &RegistrationDraft) -> StoreResult<()>;

    async fn get(&self, transaction_id: Uuid) -> StoreResult<RegistrationDraft>;

    /// Atomically flips the `promoted` marker. Returns `true` for the one
    /// caller that wins the claim, `false` for everyone else. This is the
    /// check-and-set that keeps promotion at-most-once under concurrent
    /// status polls.
    async fn claim_for_promotion(&self, transaction_id: Uuid) -> StoreResult<bool>;

    /// Drops unpromoted drafts whose retention deadline has passed or whose
    /// gating transaction failed. Returns the number removed.
    async fn purge_stale(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

/// Persisted member accounts.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Inserts a new account. Uniqueness violations (phone, email, source
    /// transaction) surface as `Conflict`.
    async fn insert(&self, account: &Account) -> StoreResult<()>;

    async fn find_by_source_transaction(&self, transaction_id: Uuid)
        -> StoreResult<Option<Account>>;
}
