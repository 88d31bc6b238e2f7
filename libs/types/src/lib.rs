//! Types library for the reentrancy ledger model
//!
//! Core type definitions shared by the contract crate and the scenario
//! simulator. Every contract and externally owned account is addressed by an
//! [`ids::AccountId`]; every fund movement is denominated in [`numeric::Amount`].
//!
//! # Modules
//! - `ids`: Account / contract identifiers
//! - `numeric`: Fixed-point currency amounts
//! - `errors`: Error taxonomy for the shared types

pub mod ids;
pub mod numeric;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::errors::*;
}
