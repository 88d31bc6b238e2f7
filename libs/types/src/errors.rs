//! Error types for the shared ledger types
//!
//! Comprehensive error taxonomy using thiserror

use thiserror::Error;

/// Amount parsing and conversion errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AmountError {
    #[error("Invalid amount: {input}")]
    Invalid { input: String },

    #[error("Amount must not be negative: {value}")]
    Negative { value: String },

    #[error("Amount {value} has more than {max_decimals} decimal places")]
    TooPrecise { value: String, max_decimals: u32 },

    #[error("Amount overflow: {value}")]
    Overflow { value: String },
}
