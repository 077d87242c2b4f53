//! Core types and utilities for tutor-credits.
//!
//! This crate provides the foundational types used throughout the credit
//! metering platform:
//!
//! - **Identifiers**: `UserId`, `TransactionId`
//! - **Accounts**: `CreditAccount`
//! - **Transactions**: `CreditTransaction`, `TransactionType`
//! - **Operations**: `OperationKind` (the static cost table)
//! - **Ledger results**: `CreditCheck`, `DeductOutcome`, `GrantOutcome`,
//!   `GateDecision`, `DenialReason`
//!
//! # Credit Unit
//!
//! **1 credit = one unit of entitlement consumed per costed AI operation.**
//!
//! - OCR of a worksheet photo costs 1 credit
//! - Generating a worked solution costs 2 credits
//! - Stored as `i64` integers; the balance is never allowed to go negative

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod error;
pub mod gate;
pub mod ids;
pub mod operation;
pub mod transaction;

pub use account::{CreditAccount, DEFAULT_STARTER_GRANT_CREDITS};
pub use error::{LedgerError, Result};
pub use gate::{CreditCheck, DeductOutcome, DenialReason, GateDecision, GrantOutcome};
pub use ids::{IdError, TransactionId, UserId};
pub use operation::OperationKind;
pub use transaction::{CreditTransaction, TransactionType};
