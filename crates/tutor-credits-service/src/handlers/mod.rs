//! HTTP request handlers.

pub mod accounts;
pub mod credits;
pub mod gate;
pub mod health;
