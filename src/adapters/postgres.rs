//! Postgres implementations of the store ports.
//!
//! Internal `*Row` types mirror the table layout; domain conversions parse
//! the closed status/kind enums so an unexpected value in storage is an
//! error instead of a silent fallthrough. Terminal-write and promotion
//! races are settled in SQL: conditional updates checking the previous
//! state, first writer wins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Account, RegistrationDraft, RegistrationProfile, Transaction, TxKind, TxStatus};
use crate::ports::{
    AccountStore, DraftStore, GatewayRefs, StoreError, StoreResult, TransactionStore,
};

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Postgres-backed transaction store.
#[derive(Clone)]
pub struct PostgresTransactionStore {
    pool: PgPool,
}

impl PostgresTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionStore for PostgresTransactionStore {
    async fn create(&self, tx: &Transaction) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, owner_id, amount, kind, status,
                merchant_ref, checkout_ref, description, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(tx.id)
        .bind(tx.owner_id)
        .bind(&tx.amount)
        .bind(tx.kind.as_str())
        .bind(tx.status.as_str())
        .bind(&tx.merchant_ref)
        .bind(&tx.checkout_ref)
        .bind(&tx.description)
        .bind(tx.created_at)
        .bind(tx.updated_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.ok_or_else(|| StoreError::NotFound(format!("transaction {}", id)))?
            .into_domain()
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

        let (merchant_ref, checkout_ref) = match refs {
            Some(refs) => (Some(refs.merchant_ref), Some(refs.checkout_ref)),
            None => (None, None),
        };

        // The status guard makes concurrent terminal writes serialize on the
        // row: only the first update matches, later ones affect zero rows.
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = $2,
                updated_at = NOW(),
                merchant_ref = COALESCE($3, merchant_ref),
                checkout_ref = COALESCE($4, checkout_ref)
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(merchant_ref)
        .bind(checkout_ref)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let exists = sqlx::query("SELECT 1 FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        match exists {
            Some(_) => Err(StoreError::InvalidTransition(id)),
            None => Err(StoreError::NotFound(format!("transaction {}", id))),
        }
    }

    async fn find_by_checkout_ref(&self, checkout_ref: &str) -> StoreResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM transactions WHERE checkout_ref = $1",
        )
        .bind(checkout_ref)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.ok_or_else(|| StoreError::NotFound(format!("checkout ref {}", checkout_ref)))?
            .into_domain()
    }
}

/// Postgres-backed registration draft store.
#[derive(Clone)]
pub struct PostgresDraftStore {
    pool: PgPool,
}

impl PostgresDraftStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DraftStore for PostgresDraftStore {
    async fn create(&self, draft: &RegistrationDraft) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO registration_drafts (
                transaction_id, full_name, phone, email, id_number,
                promoted, created_at, expires_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(draft.transaction_id)
        .bind(&draft.profile.full_name)
        .bind(&draft.profile.phone)
        .bind(&draft.profile.email)
        .bind(&draft.profile.id_number)
        .bind(draft.promoted)
        .bind(draft.created_at)
        .bind(draft.expires_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn get(&self, transaction_id: Uuid) -> StoreResult<RegistrationDraft> {
        let row = sqlx::query_as::<_, DraftRow>(
            "SELECT * FROM registration_drafts WHERE transaction_id = $1",
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(DraftRow::into_domain)
            .ok_or_else(|| StoreError::NotFound(format!("draft for transaction {}", transaction_id)))
    }

    async fn claim_for_promotion(&self, transaction_id: Uuid) -> StoreResult<bool> {
        // Single check-and-set on the promoted marker; concurrent status
        // polls race here and exactly one wins.
        let result = sqlx::query(
            "UPDATE registration_drafts SET promoted = TRUE WHERE transaction_id = $1 AND promoted = FALSE",
        )
        .bind(transaction_id)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        let exists = sqlx::query("SELECT 1 FROM registration_drafts WHERE transaction_id = $1")
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        match exists {
            Some(_) => Ok(false),
            None => Err(StoreError::NotFound(format!(
                "draft for transaction {}",
                transaction_id
            ))),
        }
    }

    async fn purge_stale(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM registration_drafts d
            USING transactions t
            WHERE d.transaction_id = t.id
              AND d.promoted = FALSE
              AND (t.status = 'failed' OR d.expires_at <= $1)
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(result.rows_affected())
    }
}

/// Postgres-backed account store.
#[derive(Clone)]
pub struct PostgresAccountStore {
    pool: PgPool,
}

impl PostgresAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    async fn insert(&self, account: &Account) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (
                id, full_name, phone, email, id_number,
                source_transaction_id, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(account.id)
        .bind(&account.full_name)
        .bind(&account.phone)
        .bind(&account.email)
        .bind(&account.id_number)
        .bind(account.source_transaction_id)
        .bind(account.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                let unique = err
                    .as_database_error()
                    .map(|db| db.is_unique_violation())
                    .unwrap_or(false);
                if unique {
                    Err(StoreError::Conflict(err.to_string()))
                } else {
                    Err(backend(err))
                }
            }
        }
    }

    async fn find_by_source_transaction(
        &self,
        transaction_id: Uuid,
    ) -> StoreResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT * FROM accounts WHERE source_transaction_id = $1",
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        Ok(row.map(AccountRow::into_domain))
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    owner_id: Option<Uuid>,
    amount: bigdecimal::BigDecimal,
    kind: String,
    status: String,
    merchant_ref: Option<String>,
    checkout_ref: Option<String>,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TransactionRow {
    fn into_domain(self) -> StoreResult<Transaction> {
        let kind = TxKind::parse(&self.kind)
            .ok_or_else(|| StoreError::Backend(format!("unknown transaction kind {:?}", self.kind)))?;
        let status = TxStatus::parse(&self.status).ok_or_else(|| {
            StoreError::Backend(format!("unknown transaction status {:?}", self.status))
        })?;

        Ok(Transaction {
            id: self.id,
            owner_id: self.owner_id,
            amount: self.amount,
            kind,
            status,
            merchant_ref: self.merchant_ref,
            checkout_ref: self.checkout_ref,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DraftRow {
    transaction_id: Uuid,
    full_name: String,
    phone: String,
    email: String,
    id_number: String,
    promoted: bool,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl DraftRow {
    fn into_domain(self) -> RegistrationDraft {
        RegistrationDraft {
            transaction_id: self.transaction_id,
            profile: RegistrationProfile {
                full_name: self.full_name,
                phone: self.phone,
                email: self.email,
                id_number: self.id_number,
            },
            promoted: self.promoted,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    full_name: String,
    phone: String,
    email: String,
    id_number: String,
    source_transaction_id: Uuid,
    created_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_domain(self) -> Account {
        Account {
            id: self.id,
            full_name: self.full_name,
            phone: self.phone,
            email: self.email,
            id_number: self.id_number,
            source_transaction_id: self.source_transaction_id,
            created_at: self.created_at,
        }
    }
}
