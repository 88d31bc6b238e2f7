//! Scenario error types

use contracts::errors::{AttackError, LedgerError, TransferError};
use thiserror::Error;
use types::errors::AmountError;

/// Errors raised while loading or running a scenario
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScenarioError {
    #[error("Invalid scenario config: {0}")]
    Config(String),

    #[error("Unknown account label: {label}")]
    UnknownAccount { label: String },

    #[error("Duplicate account label: {label}")]
    DuplicateAccount { label: String },

    #[error("Re-entry depth {depth} exceeds limit {max}")]
    ReentryDepth { depth: u128, max: u64 },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Amount error: {0}")]
    Amount(#[from] AmountError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Attack error: {0}")]
    Attack(#[from] AttackError),
}
