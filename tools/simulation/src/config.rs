//! Scenario configuration
//!
//! A scenario names its signers by label, so configs read like the test
//! scripts they replace:
//!
//! ```json
//! {
//!   "name": "drain",
//!   "accounts": [{ "label": "alice", "funds": "10000" }, ...],
//!   "donations": [{ "from": "alice", "to": "bob", "amount": "10" }],
//!   "attacker_owner": "attacker",
//!   "seed": "1",
//!   "attached_value": "1",
//!   "max_reentry_depth": 256,
//!   "ledger": { "withdraw_mode": "interaction_first" }
//! }
//! ```
//!
//! Amounts are whole-unit decimal strings.

use std::collections::HashSet;
use std::path::Path;

use contracts::ledger::LedgerConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ScenarioError;

/// Default cap on nested `withdraw` frames in one scenario run.
pub const DEFAULT_MAX_REENTRY_DEPTH: u64 = 256;

/// Signer funded at genesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundedAccount {
    pub label: String,
    pub funds: Decimal,
}

/// One `donate` call replayed before the attack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonationStep {
    pub from: String,
    pub to: String,
    pub amount: Decimal,
}

/// Full scenario description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub name: String,
    pub accounts: Vec<FundedAccount>,
    pub donations: Vec<DonationStep>,
    /// Signer that deploys (and owns) the attacker
    pub attacker_owner: String,
    /// Signer that calls `attack`; the owner when absent
    pub attack_caller: Option<String>,
    pub seed: Decimal,
    /// Value attached to the `attack` call
    pub attached_value: Decimal,
    /// Refuse attacks that would nest more `withdraw` frames than this
    pub max_reentry_depth: u64,
    pub ledger: LedgerConfig,
}

impl Default for ScenarioConfig {
    /// Reference exploit: 30 units donated by honest signers, seed of 1.
    fn default() -> Self {
        let signer = |label: &str| FundedAccount {
            label: label.to_string(),
            funds: Decimal::from(10_000),
        };
        let donation = |from: &str, to: &str, amount: i64| DonationStep {
            from: from.to_string(),
            to: to.to_string(),
            amount: Decimal::from(amount),
        };

        Self {
            name: "reference-drain".to_string(),
            accounts: vec![
                signer("owner"),
                signer("attacker"),
                signer("alice"),
                signer("bob"),
                signer("carol"),
            ],
            donations: vec![donation("alice", "bob", 10), donation("bob", "carol", 20)],
            attacker_owner: "attacker".to_string(),
            attack_caller: None,
            seed: Decimal::ONE,
            attached_value: Decimal::ONE,
            max_reentry_depth: DEFAULT_MAX_REENTRY_DEPTH,
            ledger: LedgerConfig::default(),
        }
    }
}

impl ScenarioConfig {
    /// Parse and validate a JSON scenario.
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ScenarioError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON scenario file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let json = std::fs::read_to_string(path).map_err(|e| ScenarioError::Io(e.to_string()))?;
        Self::from_json(&json)
    }

    /// Check that labels are unique and every referenced label exists.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let mut labels = HashSet::new();
        for account in &self.accounts {
            if !labels.insert(account.label.as_str()) {
                return Err(ScenarioError::DuplicateAccount {
                    label: account.label.clone(),
                });
            }
        }

        let referenced = self
            .donations
            .iter()
            .flat_map(|d| [d.from.as_str(), d.to.as_str()])
            .chain(std::iter::once(self.attacker_owner.as_str()))
            .chain(self.attack_caller.as_deref());

        for label in referenced {
            if !labels.contains(label) {
                return Err(ScenarioError::UnknownAccount {
                    label: label.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Identity that calls `attack`.
    pub fn caller_label(&self) -> &str {
        self.attack_caller.as_deref().unwrap_or(&self.attacker_owner)
    }
}
