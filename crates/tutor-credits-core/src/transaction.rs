//! Credit transaction types.
//!
//! Every balance change appends exactly one immutable transaction record.
//! The sum of a user's signed transaction amounts always equals the current
//! balance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{OperationKind, TransactionId, UserId};

/// A credit transaction representing one balance change.
///
/// Transactions use ULIDs for time-ordered IDs and are append-only: they are
/// never mutated or deleted after being written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditTransaction {
    /// Unique transaction ID (ULID for time-ordering).
    pub id: TransactionId,

    /// The user whose balance was affected.
    pub user_id: UserId,

    /// Signed amount. Positive = grant, negative = deduction.
    pub amount: i64,

    /// Type of transaction.
    pub transaction_type: TransactionType,

    /// Balance after this transaction.
    pub balance_after: i64,

    /// Human-readable description.
    pub description: String,

    /// Additional metadata, carried verbatim and opaque to the ledger
    /// (payment event IDs, model names, document IDs, ...).
    pub metadata: serde_json::Value,

    /// When the transaction was created.
    pub created_at: DateTime<Utc>,
}

impl CreditTransaction {
    /// Create a usage transaction (deduction) for an AI operation.
    ///
    /// The amount is always recorded as negative regardless of the sign of
    /// `cost`.
    #[must_use]
    pub fn usage(
        user_id: UserId,
        operation: OperationKind,
        cost: i64,
        balance_after: i64,
        description: String,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            user_id,
            amount: -cost.abs(),
            transaction_type: TransactionType::Usage,
            balance_after,
            description,
            metadata: serde_json::json!({ "operation": operation.as_str() }),
            created_at: Utc::now(),
        }
    }

    /// Create a grant transaction of the given type.
    #[must_use]
    pub fn grant(
        user_id: UserId,
        amount: i64,
        transaction_type: TransactionType,
        balance_after: i64,
        description: String,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            user_id,
            amount: amount.abs(),
            transaction_type,
            balance_after,
            description,
            metadata,
            created_at: Utc::now(),
        }
    }

    /// Create the one-time starter grant written at account creation.
    #[must_use]
    pub fn starter_grant(user_id: UserId, amount: i64) -> Self {
        Self::grant(
            user_id,
            amount,
            TransactionType::StarterGrant,
            amount,
            format!("Starter grant of {amount} credits"),
            serde_json::Value::Null,
        )
    }
}

/// Type of credit transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Credits deducted for a costed AI operation.
    Usage,

    /// User purchased credits.
    Purchase,

    /// Monthly subscription credit grant.
    SubscriptionGrant,

    /// Promotional/bonus credits.
    Bonus,

    /// Refund issued.
    Refund,

    /// One-time grant applied when the account is created.
    StarterGrant,
}

impl TransactionType {
    /// Wire name of this transaction type (snake_case, matching serde).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Usage => "usage",
            Self::Purchase => "purchase",
            Self::SubscriptionGrant => "subscription_grant",
            Self::Bonus => "bonus",
            Self::Refund => "refund",
            Self::StarterGrant => "starter_grant",
        }
    }

    /// Whether this transaction type adds credits (positive balance change).
    #[must_use]
    pub const fn is_credit(&self) -> bool {
        matches!(
            self,
            Self::Purchase
                | Self::SubscriptionGrant
                | Self::Bonus
                | Self::Refund
                | Self::StarterGrant
        )
    }

    /// Whether this transaction type removes credits (negative balance change).
    #[must_use]
    pub const fn is_debit(&self) -> bool {
        matches!(self, Self::Usage)
    }
}

impl std::str::FromStr for TransactionType {
    type Err = crate::error::LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "usage" => Ok(Self::Usage),
            "purchase" => Ok(Self::Purchase),
            "subscription_grant" => Ok(Self::SubscriptionGrant),
            "bonus" => Ok(Self::Bonus),
            "refund" => Ok(Self::Refund),
            "starter_grant" => Ok(Self::StarterGrant),
            other => Err(crate::error::LedgerError::Serialization(format!(
                "unknown transaction type: {other}"
            ))),
        }
    }
}
