//! Ledger operation results and the provider-selection decision.
//!
//! The ledger never raises errors for its policy operations; every outcome
//! (including storage failures) is folded into these structured results so
//! route handlers can branch on them directly. A `DenialReason` distinguishes
//! a genuinely empty balance from a failed lookup, which would otherwise
//! produce the same `0`.

use serde::{Deserialize, Serialize};

/// Why a check or deduction did not allow premium access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// Balance is lower than the operation cost.
    InsufficientCredits,

    /// No account record exists for the user.
    AccountNotFound,

    /// The storage layer failed or timed out. Fail closed: an ambiguous
    /// outcome must never grant premium access.
    StorageError,
}

/// Result of a read-only balance inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditCheck {
    /// True iff the stored balance is greater than zero.
    pub has_credits: bool,

    /// The stored balance, or 0 on lookup miss / storage failure.
    pub current_balance: i64,

    /// Policy signal for provider selection. Currently mirrors
    /// `has_credits`; kept distinct so plan-tier overrides can be layered
    /// in without changing the deduction contract.
    pub should_use_premium: bool,

    /// Set when the check degraded to "no credits" for a reason other than
    /// an actually-zero balance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenialReason>,
}

impl CreditCheck {
    /// A check that found a real balance.
    #[must_use]
    pub fn available(balance: i64) -> Self {
        let has_credits = balance > 0;
        Self {
            has_credits,
            current_balance: balance,
            should_use_premium: has_credits,
            reason: if has_credits {
                None
            } else {
                Some(DenialReason::InsufficientCredits)
            },
        }
    }

    /// A check that degraded to "no credits" (lookup miss or storage error).
    #[must_use]
    pub fn denied(reason: DenialReason) -> Self {
        Self {
            has_credits: false,
            current_balance: 0,
            should_use_premium: false,
            reason: Some(reason),
        }
    }
}

/// Result of a deduction attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeductOutcome {
    /// Whether the deduction was applied.
    pub success: bool,

    /// Balance after the attempt. On insufficient funds this is the
    /// unchanged pre-attempt balance; on storage failure it is 0.
    pub new_balance: i64,

    /// Opaque error text when the storage layer failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Why the deduction was not applied, when it wasn't.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenialReason>,
}

impl DeductOutcome {
    /// A successful deduction.
    #[must_use]
    pub fn applied(new_balance: i64) -> Self {
        Self {
            success: true,
            new_balance,
            error: None,
            reason: None,
        }
    }

    /// The balance could not cover the cost; nothing was written.
    #[must_use]
    pub fn insufficient(current_balance: i64) -> Self {
        Self {
            success: false,
            new_balance: current_balance,
            error: None,
            reason: Some(DenialReason::InsufficientCredits),
        }
    }

    /// The deduction failed for a non-business reason.
    #[must_use]
    pub fn failed(reason: DenialReason, error: impl Into<String>) -> Self {
        Self {
            success: false,
            new_balance: 0,
            error: Some(error.into()),
            reason: Some(reason),
        }
    }
}

/// Result of a grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantOutcome {
    /// Whether the grant was applied.
    pub success: bool,

    /// Balance after the grant (0 on failure).
    pub new_balance: i64,

    /// Opaque error text when the grant failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GrantOutcome {
    /// A successful grant.
    #[must_use]
    pub fn applied(new_balance: i64) -> Self {
        Self {
            success: true,
            new_balance,
            error: None,
        }
    }

    /// A failed grant.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            new_balance: 0,
            error: Some(error.into()),
        }
    }
}

/// The composed check-and-deduct decision every premium route branches on.
///
/// `use_premium` reflects the *deduction's* success, not the initial check:
/// a concurrent caller may drain the balance between the two, and the atomic
/// deduction is the authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateDecision {
    /// Route to the costed vision-capable provider iff true; otherwise the
    /// free text-only provider (or an upgrade prompt). Never call the costed
    /// provider when this is false.
    pub use_premium: bool,

    /// Latest known balance.
    pub credit_balance: i64,

    /// The full deduction result when a deduction was attempted, for
    /// observability. Absent when the fast-path check short-circuited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deduction: Option<DeductOutcome>,
}
