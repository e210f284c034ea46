//! In-memory implementations of the store ports.
//!
//! Thread-safe via `Arc<RwLock<HashMap<..>>>`. Used by tests and local
//! development; the single write lock per store gives the same
//! first-terminal-write-wins behavior the Postgres adapter gets from
//! conditional updates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{Account, RegistrationDraft, Transaction, TxStatus};
use crate::ports::{
    AccountStore, DraftStore, GatewayRefs, StoreError, StoreResult, TransactionStore,
};

#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    transactions: Arc<RwLock<HashMap<Uuid, Transaction>>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored transactions. Test helper for the
    /// exactly-one-transaction-per-initiation property.
    pub async fn len(&self) -> usize {
        self.transactions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.transactions.read().await.is_empty()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn create(&self, tx: &Transaction) -> StoreResult<()> {
        let mut transactions = self.transactions.write().await;
        if transactions.contains_key(&tx.id) {
            return Err(StoreError::Conflict(format!("transaction {}", tx.id)));
        }
        transactions.insert(tx.id, tx.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Transaction> {
        let transactions = self.transactions.read().await;
        transactions
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("transaction {}", id)))
    }

    async fn set_terminal(
        &self,
        id: Uuid,
        status: TxStatus,
        refs: Option<GatewayRefs>,
    ) -> StoreResult<()> {
        if !status.is_terminal() {
            return Err(StoreError::InvalidTransition(id));
        }

        let mut transactions = self.transactions.write().await;
        let tx = transactions
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("transaction {}", id)))?;

        if tx.status.is_terminal() {
            return Err(StoreError::InvalidTransition(id));
        }

        tx.status = status;
        tx.updated_at = Utc::now();
        if let Some(refs) = refs {
            tx.merchant_ref = Some(refs.merchant_ref);
            tx.checkout_ref = Some(refs.checkout_ref);
        }
        Ok(())
    }

    async fn find_by_checkout_ref(&self, checkout_ref: &str) -> StoreResult<Transaction> {
        let transactions = self.transactions.read().await;
        transactions
            .values()
            .find(|tx| tx.checkout_ref.as_deref() == Some(checkout_ref))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("checkout ref {}", checkout_ref)))
    }
}

#[derive(Default, Clone)]
pub struct InMemoryDraftStore {
    drafts: Arc<RwLock<HashMap<Uuid, RegistrationDraft>>>,
    // Stale purging needs the gating transaction's status.
    transactions: Arc<RwLock<HashMap<Uuid, Transaction>>>,
}

impl InMemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Couples this draft store to a transaction store so `purge_stale`
    /// can see gating transaction statuses.
    pub fn sharing_transactions(transactions: &InMemoryTransactionStore) -> Self {
        Self {
            drafts: Arc::default(),
            transactions: transactions.transactions.clone(),
        }
    }

    pub async fn len(&self) -> usize {
        self.drafts.read().await.len()
    }
}

#[async_trait]
impl DraftStore for InMemoryDraftStore {
    async fn create(&self, draft: &RegistrationDraft) -> StoreResult<()> {
        let mut drafts = self.drafts.write().await;
        if drafts.contains_key(&draft.transaction_id) {
            return Err(StoreError::Conflict(format!(
                "draft for transaction {}",
                draft.transaction_id
            )));
        }
        drafts.insert(draft.transaction_id, draft.clone());
        Ok(())
    }

    async fn get(&self, transaction_id: Uuid) -> StoreResult<RegistrationDraft> {
        let drafts = self.drafts.read().await;
        drafts
            .get(&transaction_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("draft for transaction {}", transaction_id)))
    }

    async fn claim_for_promotion(&self, transaction_id: Uuid) -> StoreResult<bool> {
        let mut drafts = self.drafts.write().await;
        let draft = drafts
            .get_mut(&transaction_id)
            .ok_or_else(|| StoreError::NotFound(format!("draft for transaction {}", transaction_id)))?;

        if draft.promoted {
            return Ok(false);
        }
        draft.promoted = true;
        Ok(true)
    }

    async fn purge_stale(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let transactions = self.transactions.read().await;
        let mut drafts = self.drafts.write().await;

        let before = drafts.len();
        drafts.retain(|tx_id, draft| {
            if draft.promoted {
                return true;
            }
            let failed = transactions
                .get(tx_id)
                .map(|tx| tx.status == TxStatus::Failed)
                .unwrap_or(false);
            !failed && draft.expires_at > now
        });
        Ok((before - drafts.len()) as u64)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<HashMap<Uuid, Account>>>,
    /// When set, the next insert fails with a conflict. Lets tests exercise
    /// the late-firing-uniqueness promotion failure path.
    fail_next_insert: Arc<RwLock<bool>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn fail_next_insert(&self) {
        *self.fail_next_insert.write().await = true;
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn insert(&self, account: &Account) -> StoreResult<()> {
        {
            let mut fail = self.fail_next_insert.write().await;
            if *fail {
                *fail = false;
                return Err(StoreError::Conflict("accounts_phone_key".to_string()));
            }
        }

        let mut accounts = self.accounts.write().await;
        let duplicate = accounts.values().any(|existing| {
            existing.phone == account.phone
                || existing.email == account.email
                || existing.source_transaction_id == account.source_transaction_id
        });
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "account for transaction {}",
                account.source_transaction_id
            )));
        }
        accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn find_by_source_transaction(
        &self,
        transaction_id: Uuid,
    ) -> StoreResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|account| account.source_transaction_id == transaction_id)
            .cloned())
    }
}
