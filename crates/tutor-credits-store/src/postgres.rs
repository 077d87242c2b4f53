//! PostgreSQL storage implementation.
//!
//! Deductions rely on a conditional update checked by affected rows:
//!
//! ```sql
//! UPDATE accounts SET balance = balance - $2
//! WHERE user_id = $1 AND balance >= $2
//! ```
//!
//! run inside a database transaction together with the ledger-row insert, so
//! the balance can never go negative and a balance change never lands
//! without its transaction record. This holds across any number of service
//! processes sharing the database.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use tutor_credits_core::{CreditAccount, CreditTransaction, TransactionId, UserId};

use crate::error::{Result, StoreError};
use crate::Store;

/// PostgreSQL-backed storage implementation.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to PostgreSQL and run pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration fails.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool (used by tests that manage their own schema).
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    fn account_from_row(row: &PgRow) -> Result<CreditAccount> {
        Ok(CreditAccount {
            user_id: UserId::from_uuid(row.try_get("user_id")?),
            balance: row.try_get("balance")?,
            lifetime_granted: row.try_get("lifetime_granted")?,
            lifetime_used: row.try_get("lifetime_used")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn transaction_from_row(row: &PgRow) -> Result<CreditTransaction> {
        let id: String = row.try_get("id")?;
        let transaction_type: String = row.try_get("transaction_type")?;
        Ok(CreditTransaction {
            id: id
                .parse()
                .map_err(|e: tutor_credits_core::IdError| StoreError::Serialization(e.to_string()))?,
            user_id: UserId::from_uuid(row.try_get("user_id")?),
            amount: row.try_get("amount")?,
            transaction_type: transaction_type
                .parse()
                .map_err(|e: tutor_credits_core::LedgerError| {
                    StoreError::Serialization(e.to_string())
                })?,
            balance_after: row.try_get("balance_after")?,
            description: row.try_get("description")?,
            metadata: row.try_get("metadata")?,
            created_at: row.try_get("created_at")?,
        })
    }

    /// Insert the ledger row, stamping `balance_after` with the balance the
    /// enclosing database transaction just computed.
    async fn insert_transaction<'e, E>(
        executor: E,
        tx: &CreditTransaction,
        balance_after: i64,
    ) -> Result<()>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        sqlx::query(
            "INSERT INTO credit_transactions \
             (id, user_id, amount, transaction_type, balance_after, description, metadata, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(tx.id.to_string())
        .bind(*tx.user_id.as_uuid())
        .bind(tx.amount)
        .bind(tx.transaction_type.as_str())
        .bind(balance_after)
        .bind(&tx.description)
        .bind(&tx.metadata)
        .bind(tx.created_at)
        .execute(executor)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn put_account(&self, account: &CreditAccount) -> Result<()> {
        sqlx::query(
            "INSERT INTO accounts \
             (user_id, balance, lifetime_granted, lifetime_used, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (user_id) DO UPDATE SET \
               balance = EXCLUDED.balance, \
               lifetime_granted = EXCLUDED.lifetime_granted, \
               lifetime_used = EXCLUDED.lifetime_used, \
               updated_at = EXCLUDED.updated_at",
        )
        .bind(*account.user_id.as_uuid())
        .bind(account.balance)
        .bind(account.lifetime_granted)
        .bind(account.lifetime_used)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn create_account(
        &self,
        account: &CreditAccount,
        starter_grant: Option<&CreditTransaction>,
    ) -> Result<CreditAccount> {
        let mut db_tx = self.pool.begin().await?;

        // ON CONFLICT DO NOTHING keyed on the primary key makes the insert
        // the conflict check: whichever concurrent registration commits
        // first wins, the other sees zero affected rows.
        let inserted = sqlx::query(
            "INSERT INTO accounts \
             (user_id, balance, lifetime_granted, lifetime_used, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(*account.user_id.as_uuid())
        .bind(account.balance)
        .bind(account.lifetime_granted)
        .bind(account.lifetime_used)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&mut *db_tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists);
        }

        let mut account = account.clone();

        if let Some(tx) = starter_grant {
            let row = sqlx::query(
                "UPDATE accounts SET \
                   balance = balance + $2, \
                   lifetime_granted = lifetime_granted + $2, \
                   updated_at = now() \
                 WHERE user_id = $1 \
                 RETURNING balance, lifetime_granted, updated_at",
            )
            .bind(*account.user_id.as_uuid())
            .bind(tx.amount)
            .fetch_one(&mut *db_tx)
            .await?;

            account.balance = row.try_get("balance")?;
            account.lifetime_granted = row.try_get("lifetime_granted")?;
            account.updated_at = row.try_get("updated_at")?;

            Self::insert_transaction(&mut *db_tx, tx, account.balance).await?;
        }

        db_tx.commit().await?;

        Ok(account)
    }

    async fn get_account(&self, user_id: &UserId) -> Result<Option<CreditAccount>> {
        let row = sqlx::query("SELECT * FROM accounts WHERE user_id = $1")
            .bind(*user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| Self::account_from_row(&r)).transpose()
    }

    async fn deduct_credits(
        &self,
        user_id: &UserId,
        amount: i64,
        transaction: &CreditTransaction,
    ) -> Result<i64> {
        let mut db_tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE accounts SET \
               balance = balance - $2, \
               lifetime_used = lifetime_used + $2, \
               updated_at = now() \
             WHERE user_id = $1 AND balance >= $2 \
             RETURNING balance",
        )
        .bind(*user_id.as_uuid())
        .bind(amount)
        .fetch_optional(&mut *db_tx)
        .await?;

        let Some(row) = updated else {
            // No row updated: distinguish a missing account from an
            // insufficient balance with a plain read.
            let balance = sqlx::query("SELECT balance FROM accounts WHERE user_id = $1")
                .bind(*user_id.as_uuid())
                .fetch_optional(&mut *db_tx)
                .await?;

            return match balance {
                None => Err(StoreError::NotFound),
                Some(row) => Err(StoreError::InsufficientCredits {
                    balance: row.try_get("balance")?,
                    required: amount,
                }),
            };
        };

        let new_balance: i64 = row.try_get("balance")?;
        Self::insert_transaction(&mut *db_tx, transaction, new_balance).await?;
        db_tx.commit().await?;

        Ok(new_balance)
    }

    async fn add_credits(
        &self,
        user_id: &UserId,
        amount: i64,
        transaction: &CreditTransaction,
    ) -> Result<i64> {
        let mut db_tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE accounts SET \
               balance = balance + $2, \
               lifetime_granted = lifetime_granted + $2, \
               updated_at = now() \
             WHERE user_id = $1 \
             RETURNING balance",
        )
        .bind(*user_id.as_uuid())
        .bind(amount)
        .fetch_optional(&mut *db_tx)
        .await?;

        let row = updated.ok_or(StoreError::NotFound)?;
        let new_balance: i64 = row.try_get("balance")?;

        Self::insert_transaction(&mut *db_tx, transaction, new_balance).await?;
        db_tx.commit().await?;

        Ok(new_balance)
    }

    async fn get_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<CreditTransaction>> {
        let row = sqlx::query("SELECT * FROM credit_transactions WHERE id = $1")
            .bind(transaction_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| Self::transaction_from_row(&r)).transpose()
    }

    async fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>> {
        let rows = sqlx::query(
            "SELECT * FROM credit_transactions \
             WHERE user_id = $1 \
             ORDER BY id DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(*user_id.as_uuid())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::transaction_from_row).collect()
    }
}
