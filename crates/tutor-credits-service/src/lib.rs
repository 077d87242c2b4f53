//! Credit ledger, provider gate, and HTTP API for tutor-credits.
//!
//! The service meters AI operations against per-user credit balances and
//! answers, per request, whether to route to the premium provider (balance
//! deducted) or the free tier (no charge). Policy lives in [`CreditLedger`];
//! the HTTP layer is a thin Axum surface over it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use ledger::{CreditLedger, MAX_HISTORY_LIMIT};
pub use routes::create_router;
pub use state::AppState;
