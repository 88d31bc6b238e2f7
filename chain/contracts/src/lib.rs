//! Custodial ledger and reentrancy attacker contracts
//!
//! This crate models a minimal custodial ledger that pays a caller before it
//! updates the caller's balance record, and an attacker contract whose receipt
//! handler re-enters the withdrawal path to drain the ledger.
//!
//! # Modules
//! - `errors`: Contract-specific error types
//! - `events`: Ledger event log entries
//! - `context`: Caller identity and attached value for a contract call
//! - `bank`: Transferable funds and the `Receivable` receipt-callback interface
//! - `security`: Reentrancy guard used by the hardened withdraw mode
//! - `ledger`: Donation / withdrawal bookkeeping
//! - `attacker`: Recursive withdraw strategy against a ledger
//!
//! # Execution model
//! Everything runs on one thread and one call stack. Contracts are shared
//! through `Rc` and mutate through `RefCell`/`Cell`; no borrow is held across
//! [`bank::Bank::send`], which is the only point where control passes to
//! another contract before the caller has finished its own bookkeeping.

pub mod errors;
pub mod events;
pub mod context;
pub mod bank;
pub mod security;
pub mod ledger;
pub mod attacker;

/// Contract ABI version, frozen after release
pub const CONTRACT_ABI_VERSION: &str = "1.0.0";
