//! Account types for tutor-credits.
//!
//! A credit account holds a single non-negative integer balance per user.
//! The balance is only ever changed through the ledger operations; nothing
//! else writes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Credits granted to every newly registered account.
pub const DEFAULT_STARTER_GRANT_CREDITS: i64 = 20;

/// A credit account for a user.
///
/// Invariant: `balance >= 0` at all times. The storage layer enforces this
/// atomically; application code never decrements the balance directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditAccount {
    /// The user this account belongs to.
    pub user_id: UserId,

    /// Current credit balance.
    pub balance: i64,

    /// Lifetime credits granted (purchases, subscriptions, bonuses, refunds).
    pub lifetime_granted: i64,

    /// Lifetime credits consumed by AI operations.
    pub lifetime_used: i64,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl CreditAccount {
    /// Create a new account with zero balance.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            balance: 0,
            lifetime_granted: 0,
            lifetime_used: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether the account can cover a deduction of `amount` credits.
    #[must_use]
    pub fn has_sufficient_credits(&self, amount: i64) -> bool {
        self.balance >= amount
    }
}
