//! Tutor Credits Client SDK.
//!
//! This crate provides a client library for services to interact with the
//! tutor-credits API, most notably the AI request router which calls the
//! gate before every operation dispatch.
//!
//! # Example
//!
//! ```no_run
//! use tutor_credits_client::{CreditsClient, OperationKind};
//!
//! # async fn example() -> Result<(), tutor_credits_client::ClientError> {
//! let client = CreditsClient::new(
//!     "http://tutor-credits.platform.svc:8080",
//!     "your-service-api-key",
//! );
//!
//! // Gate an operation before dispatch
//! let decision = client
//!     .gate("user-uuid", OperationKind::SolveMath, None)
//!     .await?;
//!
//! if decision.use_premium {
//!     println!("Premium provider, {} credits left", decision.credit_balance);
//! } else {
//!     println!("Free tier");
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{ClientOptions, CreditsClient};
pub use error::ClientError;
pub use types::*;
