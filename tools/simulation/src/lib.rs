//! Scenario runner for the reentrancy ledger
//!
//! Stands in for the deployment scripts and test harness: funds signers,
//! deploys the ledger and the attacker, replays donations, launches the
//! attack, and reports what the ledger looks like afterwards.
//!
//! # Modules
//! - `errors`: Scenario error taxonomy
//! - `config`: JSON scenario description (defaults to the reference exploit)
//! - `scenario`: Runs a scenario against fresh contracts
//! - `export`: Report JSON export

pub mod errors;
pub mod config;
pub mod scenario;
pub mod export;

/// Crate version constant
pub const VERSION: &str = "1.0.0";
