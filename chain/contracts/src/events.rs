//! Ledger events
//!
//! Events are immutable records appended by ledger operations. They are the
//! only observable trace of a silent `withdraw` no-op or of a transfer that
//! failed mid-recursion.

use serde::{Deserialize, Serialize};
use types::ids::AccountId;
use types::numeric::Amount;

/// Funds donated and credited to a beneficiary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donated {
    pub donor: AccountId,
    pub beneficiary: AccountId,
    pub amount: Amount,
}

/// Funds paid out and the caller's record decremented
///
/// `depth` is the number of `withdraw` frames that were already on the stack
/// when this one started; a non-zero depth means the call was re-entrant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawn {
    pub account: AccountId,
    pub amount: Amount,
    pub remaining: Amount,
    pub depth: u32,
}

/// Why a withdrawal did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Request exceeded the caller's recorded balance
    InsufficientBalance,
    /// A withdrawal was already in flight (guarded mode only)
    Reentrant,
}

/// Withdrawal ignored without touching state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawSkipped {
    pub account: AccountId,
    pub amount: Amount,
    pub reason: SkipReason,
}

/// Payout could not be funded; the call aborted without decrementing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFailed {
    pub account: AccountId,
    pub amount: Amount,
    pub available: Amount,
    pub depth: u32,
}

/// Enum wrapper for all ledger events, enabling uniform handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    Donated(Donated),
    Withdrawn(Withdrawn),
    WithdrawSkipped(WithdrawSkipped),
    TransferFailed(TransferFailed),
}

impl LedgerEvent {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            LedgerEvent::Donated(_) => "donated",
            LedgerEvent::Withdrawn(_) => "withdrawn",
            LedgerEvent::WithdrawSkipped(_) => "withdraw_skipped",
            LedgerEvent::TransferFailed(_) => "transfer_failed",
        }
    }
}
