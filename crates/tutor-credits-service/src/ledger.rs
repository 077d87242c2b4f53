//! The credit ledger and provider-selection gate.
//!
//! `CreditLedger` is a stateless façade over the storage layer. It enforces
//! the metering policy — costs come from the static table, balances never go
//! negative, every change appends a transaction — and folds every failure
//! into a structured outcome: none of the policy operations here return an
//! error or panic, because route handlers branch on their results in the
//! common case and must stay fail-closed when storage misbehaves.

use std::sync::Arc;

use tutor_credits_core::{
    CreditAccount, CreditCheck, CreditTransaction, DeductOutcome, DenialReason, GateDecision,
    GrantOutcome, LedgerError, OperationKind, TransactionType, UserId,
};
use tutor_credits_store::{Store, StoreError};

/// Upper bound on a single history read.
pub const MAX_HISTORY_LIMIT: usize = 100;

/// The credit ledger and gate.
///
/// Holds no mutable state between calls; the storage layer's atomic update
/// primitive is the sole serialization point for a user's balance.
#[derive(Clone)]
pub struct CreditLedger {
    store: Arc<dyn Store>,
    starter_grant: i64,
}

impl CreditLedger {
    /// Create a ledger over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, starter_grant: i64) -> Self {
        Self {
            store,
            starter_grant,
        }
    }

    /// Register a credit account for a user and apply the starter grant.
    ///
    /// # Errors
    ///
    /// Returns `AccountAlreadyExists` if the user already has an account,
    /// or `Storage` if the backend fails.
    pub async fn create_account(&self, user_id: UserId) -> Result<CreditAccount, LedgerError> {
        let starter_grant = (self.starter_grant > 0)
            .then(|| CreditTransaction::starter_grant(user_id, self.starter_grant));

        // The store makes registration and the grant one atomic unit, so
        // concurrent registrations for the same user resolve to exactly one
        // account with the grant applied once.
        let account = self
            .store
            .create_account(&CreditAccount::new(user_id), starter_grant.as_ref())
            .await
            .map_err(|e| match e {
                StoreError::AlreadyExists => LedgerError::AccountAlreadyExists {
                    user_id: user_id.to_string(),
                },
                other => storage_error(other),
            })?;

        tracing::info!(
            user_id = %user_id,
            starter_grant = %self.starter_grant,
            "Credit account created"
        );

        Ok(account)
    }

    /// Fetch an account record.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the backend fails.
    pub async fn lookup_account(
        &self,
        user_id: &UserId,
    ) -> Result<Option<CreditAccount>, LedgerError> {
        self.store.get_account(user_id).await.map_err(storage_error)
    }

    /// Inspect a user's balance for provider selection. Read-only.
    ///
    /// Never fails: a lookup miss or storage error degrades to a "no
    /// credits" result, because a user with a failed lookup must never
    /// silently receive premium access.
    pub async fn check_user_credits(&self, user_id: &UserId) -> CreditCheck {
        match self.store.get_account(user_id).await {
            Ok(Some(account)) => CreditCheck::available(account.balance),
            Ok(None) => {
                tracing::debug!(user_id = %user_id, "Credit check for unknown account");
                CreditCheck::denied(DenialReason::AccountNotFound)
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Credit check failed, denying premium");
                CreditCheck::denied(DenialReason::StorageError)
            }
        }
    }

    /// Current balance; 0 on lookup miss or storage error.
    pub async fn get_credit_balance(&self, user_id: &UserId) -> i64 {
        self.check_user_credits(user_id).await.current_balance
    }

    /// The most recent `limit` transactions, newest first.
    ///
    /// `limit` is clamped to 100 to avoid unbounded reads.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the backend fails.
    pub async fn get_credit_history(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<CreditTransaction>, LedgerError> {
        let limit = limit.clamp(1, MAX_HISTORY_LIMIT);
        self.store
            .list_transactions_by_user(user_id, limit, 0)
            .await
            .map_err(storage_error)
    }

    /// Paged transaction history, newest first.
    ///
    /// `limit` is clamped to 100. The returned flag reports whether more
    /// entries exist past this page; it is derived from a one-row
    /// over-fetch that never reaches the caller.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the backend fails.
    pub async fn get_credit_history_page(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<CreditTransaction>, bool), LedgerError> {
        let limit = limit.clamp(1, MAX_HISTORY_LIMIT);
        let mut transactions = self
            .store
            .list_transactions_by_user(user_id, limit + 1, offset)
            .await
            .map_err(storage_error)?;

        let has_more = transactions.len() > limit;
        transactions.truncate(limit);

        Ok((transactions, has_more))
    }

    /// Deduct the cost of `operation` from the user's balance.
    ///
    /// The cost is resolved from the static table, never supplied by the
    /// caller. The check-and-decrement is atomic at the storage layer; on
    /// insufficient balance nothing is written and `new_balance` is the
    /// unchanged pre-attempt balance.
    pub async fn deduct_credits(
        &self,
        user_id: &UserId,
        operation: OperationKind,
        description: Option<&str>,
    ) -> DeductOutcome {
        let cost = operation.credit_cost();
        let description = description
            .map_or_else(|| format!("AI operation: {operation}"), ToString::to_string);

        // balance_after is stamped by the store inside its atomic section;
        // the value passed here is a placeholder.
        let tx = CreditTransaction::usage(*user_id, operation, cost, 0, description);

        match self.store.deduct_credits(user_id, cost, &tx).await {
            Ok(new_balance) => {
                tracing::info!(
                    user_id = %user_id,
                    operation = %operation,
                    cost = %cost,
                    new_balance = %new_balance,
                    "Credits deducted"
                );
                DeductOutcome::applied(new_balance)
            }
            Err(StoreError::InsufficientCredits { balance, required }) => {
                tracing::debug!(
                    user_id = %user_id,
                    operation = %operation,
                    balance = %balance,
                    required = %required,
                    "Deduction declined: insufficient credits"
                );
                DeductOutcome::insufficient(balance)
            }
            Err(StoreError::NotFound) => {
                tracing::debug!(user_id = %user_id, "Deduction declined: no account");
                DeductOutcome::failed(DenialReason::AccountNotFound, "account not found")
            }
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Deduction failed");
                DeductOutcome::failed(DenialReason::StorageError, e.to_string())
            }
        }
    }

    /// Grant credits to a user.
    ///
    /// `metadata` is carried verbatim into the transaction record; callers
    /// that retry (payment webhooks) should put their idempotency key there
    /// and consult history, since the ledger itself does not deduplicate.
    pub async fn grant_credits(
        &self,
        user_id: &UserId,
        amount: i64,
        transaction_type: TransactionType,
        description: Option<&str>,
        metadata: serde_json::Value,
    ) -> GrantOutcome {
        if amount <= 0 {
            tracing::warn!(user_id = %user_id, amount = %amount, "Rejected non-positive grant");
            return GrantOutcome::failed(format!("grant amount must be positive, got {amount}"));
        }
        if !transaction_type.is_credit() {
            tracing::warn!(user_id = %user_id, "Rejected grant with debit transaction type");
            return GrantOutcome::failed("grant requires a credit transaction type");
        }

        let description = description.map_or_else(
            || format!("Grant of {amount} credits"),
            ToString::to_string,
        );

        let tx = CreditTransaction::grant(*user_id, amount, transaction_type, 0, description, metadata);

        match self.store.add_credits(user_id, amount, &tx).await {
            Ok(new_balance) => {
                tracing::info!(
                    user_id = %user_id,
                    amount = %amount,
                    new_balance = %new_balance,
                    "Credits granted"
                );
                GrantOutcome::applied(new_balance)
            }
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Grant failed");
                GrantOutcome::failed(e.to_string())
            }
        }
    }

    /// The composed provider gate: check, then atomically deduct.
    ///
    /// Every premium route calls this exactly once per request before
    /// invoking the costed provider and branches strictly on `use_premium`.
    /// The initial check is only a fast-path short-circuit; the atomic
    /// deduction is the authority, since a concurrent caller may drain the
    /// balance between the two.
    pub async fn check_and_deduct(
        &self,
        user_id: &UserId,
        operation: OperationKind,
        description: Option<&str>,
    ) -> GateDecision {
        let check = self.check_user_credits(user_id).await;
        if !check.has_credits {
            // Free/degraded path is side-effect-free: no deduction attempt.
            return GateDecision {
                use_premium: false,
                credit_balance: check.current_balance,
                deduction: None,
            };
        }

        let outcome = self.deduct_credits(user_id, operation, description).await;
        let credit_balance = match outcome.reason {
            // Storage failed mid-flight; the checked balance is the latest
            // trustworthy observation.
            Some(DenialReason::StorageError | DenialReason::AccountNotFound) => {
                check.current_balance
            }
            _ => outcome.new_balance,
        };

        GateDecision {
            use_premium: outcome.success,
            credit_balance,
            deduction: Some(outcome),
        }
    }
}

fn storage_error(err: StoreError) -> LedgerError {
    match err {
        StoreError::NotFound => LedgerError::Storage("record not found".into()),
        StoreError::AlreadyExists => LedgerError::Storage("record already exists".into()),
        StoreError::InsufficientCredits { balance, required } => {
            LedgerError::InsufficientCredits { balance, required }
        }
        StoreError::Serialization(msg) => LedgerError::Serialization(msg),
        StoreError::Database(msg) => LedgerError::Storage(msg),
    }
}
