//! Error types for tutor-credits.

use crate::ids::IdError;

/// Result type for tutor-credits operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur in ledger operations.
///
/// These surface from the storage boundary and from caller misuse; the
/// ledger façade folds most of them into structured outcomes before they
/// reach route handlers.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Insufficient credits for the operation.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// Account not found.
    #[error("account not found: {user_id}")]
    AccountNotFound {
        /// The user ID that was not found.
        user_id: String,
    },

    /// Account already exists.
    #[error("account already exists: {user_id}")]
    AccountAlreadyExists {
        /// The user ID that already exists.
        user_id: String,
    },

    /// Operation kind not present in the static cost table. This is a
    /// programming error at the call site, not a user-facing condition.
    #[error("unknown operation kind: {0}")]
    UnknownOperation(String),

    /// Grant amount was zero or negative.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}
