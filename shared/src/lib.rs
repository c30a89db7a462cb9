//! Shared types and models for the bakery operations platform
//!
//! This crate holds the stock ledger arithmetic, the delivery cadence and
//! order proposal engine, and the reconciliation and reception planning used
//! by the backend and by the admin UI (via WASM).

pub mod cadence;
pub mod error;
pub mod ledger;
pub mod models;
pub mod types;
pub mod validation;

pub use cadence::*;
pub use error::*;
pub use ledger::*;
pub use models::*;
pub use types::*;
pub use validation::*;
