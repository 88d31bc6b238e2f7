//! Contract-specific error types
//!
//! Error taxonomy for value transfers, ledger operations, and the attacker.
//! Note that `Ledger::withdraw` never returns an error: an over-balance request
//! and an exhausted fund pool are both silent there and only show up in the
//! ledger's event log.

use thiserror::Error;
use types::ids::AccountId;
use types::numeric::Amount;

/// Value transfer errors raised by the fund pool
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransferError {
    #[error("Insufficient funds in {account}: required {required}, available {available}")]
    InsufficientFunds {
        account: AccountId,
        required: Amount,
        available: Amount,
    },

    #[error("Arithmetic overflow crediting {account}")]
    Overflow { account: AccountId },
}

/// Ledger-specific errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Transfer failed: {0}")]
    Transfer(#[from] TransferError),

    #[error("Arithmetic overflow in balance calculation")]
    Overflow,

    #[error("Ledger invariant violated: recorded {recorded}, held {held}")]
    InvariantViolation { recorded: Amount, held: Amount },
}

/// Attacker-specific errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AttackError {
    #[error("Attacker: NOT_OWNER")]
    Unauthorized,

    #[error("Attack seed must be positive")]
    ZeroSeed,

    #[error("Attack already in progress")]
    InProgress,

    #[error("Insufficient funds to seed attack: required {required}, available {available}")]
    InsufficientSeed { required: Amount, available: Amount },

    #[error("Transfer failed: {0}")]
    Transfer(#[from] TransferError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
