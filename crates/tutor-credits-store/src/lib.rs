//! Storage layer for tutor-credits.
//!
//! This crate owns the one mutable shared resource in the system: the credit
//! balance. Both backends guarantee that a deduction is an atomic
//! read-check-write — two concurrent deductions against a balance that only
//! covers one of them result in exactly one success — and that every balance
//! change and its transaction record land together or not at all.
//!
//! Backends:
//!
//! - [`PgStore`]: PostgreSQL via sqlx. Atomicity comes from a conditional
//!   `UPDATE ... WHERE balance >= cost` checked by affected rows, inside a
//!   database transaction with the ledger-row insert.
//! - [`RocksStore`] (feature `rocksdb-backend`, default): `RocksDB` with
//!   column families. Compound operations serialize behind a store-level
//!   write lock and commit through a single `WriteBatch`.
//!
//! # Example
//!
//! ```no_run
//! use tutor_credits_store::RocksStore;
//! use tutor_credits_core::{UserId, CreditAccount};
//!
//! let store = RocksStore::open("/tmp/tutor-credits-db").unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
#[cfg(feature = "rocksdb-backend")]
pub mod keys;
pub mod postgres;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
#[cfg(feature = "rocksdb-backend")]
pub mod schema;

pub use error::{Result, StoreError};
pub use postgres::PgStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use async_trait::async_trait;
use tutor_credits_core::{CreditAccount, CreditTransaction, TransactionId, UserId};

/// The storage trait defining all database operations.
///
/// This is the ledger's sole collaborator and the single serialization point
/// for a user's balance. The ledger holds no locks of its own; requests may
/// be handled by independent, non-cooperating processes.
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Insert or update an account record.
    ///
    /// This is a blind upsert; registration goes through
    /// [`Store::create_account`], which is conflict-checked.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn put_account(&self, account: &CreditAccount) -> Result<()>;

    /// Register a new account, optionally applying a starter grant, as one
    /// atomic unit.
    ///
    /// The existence check, the account insert, and the grant (balance
    /// update plus transaction record) either all happen or none do; two
    /// concurrent registrations for the same user cannot both succeed, so
    /// the starter grant is applied at most once. The grant amount is taken
    /// from `starter_grant.amount`.
    ///
    /// Returns the stored account, including the granted balance.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if the account is already
    /// registered.
    async fn create_account(
        &self,
        account: &CreditAccount,
        starter_grant: Option<&CreditTransaction>,
    ) -> Result<CreditAccount>;

    /// Get an account by user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_account(&self, user_id: &UserId) -> Result<Option<CreditAccount>>;

    // =========================================================================
    // Compound Operations
    // =========================================================================

    /// Deduct credits and append the usage transaction atomically.
    ///
    /// The balance check, the decrement, and the transaction append are one
    /// atomic unit with respect to any concurrent mutation of the same
    /// account: the balance can never go negative and no update is lost.
    /// On insufficient balance nothing is written. The stored record's
    /// `balance_after` is stamped with the authoritative post-deduction
    /// balance computed inside the atomic section; the value on the passed
    /// `transaction` is advisory.
    ///
    /// Returns the new balance after deduction.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account doesn't exist.
    /// - `StoreError::InsufficientCredits` if the balance is too low.
    async fn deduct_credits(
        &self,
        user_id: &UserId,
        amount: i64,
        transaction: &CreditTransaction,
    ) -> Result<i64>;

    /// Add credits and append the grant transaction atomically.
    ///
    /// Returns the new balance after addition.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    async fn add_credits(
        &self,
        user_id: &UserId,
        amount: i64,
        transaction: &CreditTransaction,
    ) -> Result<i64>;

    // =========================================================================
    // Transaction Operations
    // =========================================================================

    /// Get a transaction by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<CreditTransaction>>;

    /// List transactions for a user, newest first.
    ///
    /// Ordering is by transaction ID (ULIDs are time-ordered), so it is
    /// stable within a read even for entries created in the same millisecond.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>>;
}
