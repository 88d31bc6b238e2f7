//! Scenario execution
//!
//! Every run gets a fresh fund pool, ledger, and attacker, so runs are
//! independent and repeatable.

use std::collections::BTreeMap;
use std::rc::Rc;

use contracts::attacker::{AttackReport, Attacker};
use contracts::bank::Bank;
use contracts::context::CallContext;
use contracts::ledger::{Ledger, WithdrawMode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use types::ids::AccountId;
use types::numeric::Amount;

use crate::config::ScenarioConfig;
use crate::errors::ScenarioError;

/// Ledger state after a scenario ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub version: String,
    pub withdraw_mode: WithdrawMode,
    /// Ledger funds after donations, before the attack
    pub held_before: Amount,
    /// Ledger funds after the attack
    pub held_after: Amount,
    pub attack: AttackReport,
    /// Recorded balance per signer label
    pub recorded_balances: BTreeMap<String, Amount>,
    /// Recorded balance of the attacker contract itself
    pub attacker_recorded: Amount,
    pub recorded_total: Amount,
    /// Recorded balances still equal custodied funds
    pub invariant_holds: bool,
    /// Fund pool total unchanged by the run
    pub supply_conserved: bool,
    pub ledger_events: usize,
}

/// Run `config` against freshly deployed contracts.
pub fn run(config: &ScenarioConfig) -> Result<ScenarioReport, ScenarioError> {
    config.validate()?;
    info!(
        name = %config.name,
        mode = ?config.ledger.withdraw_mode,
        accounts = config.accounts.len(),
        "running scenario"
    );

    let bank = Rc::new(Bank::new());
    let mut signers: BTreeMap<String, AccountId> = BTreeMap::new();
    for account in &config.accounts {
        let id = AccountId::new();
        bank.credit(id, Amount::from_decimal(account.funds)?)?;
        signers.insert(account.label.clone(), id);
    }
    let supply = bank.total_supply();
    let signer = |label: &str| {
        signers
            .get(label)
            .copied()
            .ok_or_else(|| ScenarioError::UnknownAccount {
                label: label.to_string(),
            })
    };

    let ledger = Ledger::deploy(Rc::clone(&bank), config.ledger.clone());
    for step in &config.donations {
        let amount = Amount::from_decimal(step.amount)?;
        let ctx = CallContext::new(signer(&step.from)?).with_value(amount);
        ledger.donate(&ctx, signer(&step.to)?)?;
    }
    let held_before = ledger.total_held();
    let seed = Amount::from_decimal(config.seed)?;
    check_reentry_depth(config, held_before, seed)?;

    let attacker = Attacker::deploy(
        &CallContext::new(signer(&config.attacker_owner)?),
        Rc::clone(&bank),
    );
    let attached = Amount::from_decimal(config.attached_value)?;
    let ctx = CallContext::new(signer(config.caller_label())?).with_value(attached);
    let attack = attacker.attack(&ctx, Rc::clone(&ledger), seed)?;

    let recorded_balances = signers
        .iter()
        .map(|(label, id)| (label.clone(), ledger.balance_of(id)))
        .collect();
    let invariant_holds = ledger.check_invariant().is_ok();
    if !invariant_holds {
        warn!(
            recorded = %ledger.recorded_total(),
            held = %ledger.total_held(),
            "ledger no longer backs its recorded balances"
        );
    }

    Ok(ScenarioReport {
        name: config.name.clone(),
        version: crate::VERSION.to_string(),
        withdraw_mode: config.ledger.withdraw_mode,
        held_before,
        held_after: ledger.total_held(),
        attack,
        recorded_balances,
        attacker_recorded: ledger.balance_of(&attacker.address()),
        recorded_total: ledger.recorded_total(),
        invariant_holds,
        supply_conserved: bank.total_supply() == supply,
        ledger_events: ledger.events().len(),
    })
}

/// Reject attacks whose recursion would outgrow `max_reentry_depth`.
///
/// Only the pay-then-debit ordering recurses; every payout takes `seed` out of
/// `held + seed`.
fn check_reentry_depth(
    config: &ScenarioConfig,
    held: Amount,
    seed: Amount,
) -> Result<(), ScenarioError> {
    if config.ledger.withdraw_mode != WithdrawMode::InteractionFirst {
        return Ok(());
    }
    // Zero seed is left to the attacker to reject
    let pool = held.checked_add(seed).unwrap_or(Amount::MAX);
    let Some(depth) = pool.checked_div_floor(seed) else {
        return Ok(());
    };
    if depth > u128::from(config.max_reentry_depth) {
        warn!(%depth, max = config.max_reentry_depth, %seed, "attack would recurse too deeply");
        return Err(ScenarioError::ReentryDepth {
            depth,
            max: config.max_reentry_depth,
        });
    }
    Ok(())
}
