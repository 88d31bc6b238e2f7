//! Ledger: custodial donations and withdrawals
//!
//! Anyone may donate to any beneficiary; a beneficiary may later withdraw up
//! to its recorded balance. The default withdraw mode pays the caller *before*
//! decrementing the caller's record, and the payout runs the caller's receipt
//! handler synchronously. A handler that calls `withdraw` again therefore sees
//! the old balance and is paid again, until the ledger's funds run out.
//!
//! Silent paths (over-balance request, exhausted fund pool) never return an
//! error from `withdraw`; they are only visible in the event log.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use types::ids::AccountId;
use types::numeric::Amount;

use crate::bank::Bank;
use crate::context::CallContext;
use crate::errors::LedgerError;
use crate::events::{
    Donated, LedgerEvent, SkipReason, TransferFailed, WithdrawSkipped, Withdrawn,
};
use crate::security::ReentrancyGuard;

/// Ordering of bookkeeping and payout inside `withdraw`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawMode {
    /// Pay first, decrement after the payout returns. Re-entrant.
    #[default]
    InteractionFirst,
    /// Decrement first, pay after; refund the record if the payout fails.
    EffectsFirst,
    /// `InteractionFirst` ordering behind a reentrancy guard.
    Guarded,
}

/// Configuration for a ledger deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub withdraw_mode: WithdrawMode,
}

/// Custodial ledger contract.
///
/// Recorded balances live here; the funds backing them live in the shared
/// [`Bank`] under the ledger's own address.
#[derive(Debug)]
pub struct Ledger {
    /// Contract address in the bank
    address: AccountId,
    /// Shared fund pool
    bank: Rc<Bank>,
    /// Recorded balances: account -> amount
    balances: RefCell<HashMap<AccountId, Amount>>,
    config: LedgerConfig,
    /// Only consulted in `WithdrawMode::Guarded`
    reentrancy_guard: ReentrancyGuard,
    /// Number of `withdraw` frames currently on the stack
    depth: Cell<u32>,
    /// Emitted events log (append-only)
    events: RefCell<Vec<LedgerEvent>>,
}

impl Ledger {
    /// Deploy a new, empty ledger at a fresh address.
    pub fn deploy(bank: Rc<Bank>, config: LedgerConfig) -> Rc<Self> {
        let address = AccountId::new();
        info!(%address, mode = ?config.withdraw_mode, "ledger deployed");
        Rc::new(Self {
            address,
            bank,
            balances: RefCell::new(HashMap::new()),
            config,
            reentrancy_guard: ReentrancyGuard::new(),
            depth: Cell::new(0),
            events: RefCell::new(Vec::new()),
        })
    }

    pub fn address(&self) -> AccountId {
        self.address
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ───────────────────────── Donate ─────────────────────────

    /// Credit `ctx.value` to `beneficiary`, paid for by `ctx.sender`.
    ///
    /// No authorization; a zero value is a no-op credit. Fails without any
    /// state change if the sender cannot fund the value.
    pub fn donate(&self, ctx: &CallContext, beneficiary: AccountId) -> Result<(), LedgerError> {
        let amount = ctx.value;
        let credited = self
            .balance_of(&beneficiary)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        self.bank.transfer(ctx.sender, self.address, amount)?;
        self.balances.borrow_mut().insert(beneficiary, credited);

        debug!(donor = %ctx.sender, %beneficiary, %amount, "donation credited");
        self.record(LedgerEvent::Donated(Donated {
            donor: ctx.sender,
            beneficiary,
            amount,
        }));
        Ok(())
    }

    // ───────────────────────── Balance Queries ─────────────────────────

    /// Recorded balance of `account`; zero if never credited.
    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances
            .borrow()
            .get(account)
            .copied()
            .unwrap_or_default()
    }

    /// Funds actually custodied by the ledger.
    pub fn total_held(&self) -> Amount {
        self.bank.funds_of(&self.address)
    }

    /// Sum of all recorded balances.
    pub fn recorded_total(&self) -> Amount {
        self.balances
            .borrow()
            .values()
            .fold(Amount::ZERO, |acc, v| acc.checked_add(*v).unwrap_or(Amount::MAX))
    }

    /// Whether custodied funds cover every recorded balance.
    pub fn is_solvent(&self) -> bool {
        self.total_held() >= self.recorded_total()
    }

    /// Check that recorded balances and custodied funds agree exactly.
    ///
    /// Only meaningful while no `withdraw` is in flight.
    pub fn check_invariant(&self) -> Result<(), LedgerError> {
        let recorded = self.recorded_total();
        let held = self.total_held();
        if recorded != held {
            return Err(LedgerError::InvariantViolation { recorded, held });
        }
        Ok(())
    }

    // ───────────────────────── Withdraw ─────────────────────────

    /// Withdraw `amount` of the caller's recorded balance.
    ///
    /// The caller is `ctx.sender`; withdraw is not payable and ignores
    /// `ctx.value`. Never fails: an over-balance request does nothing, and a
    /// payout the fund pool cannot cover aborts before the decrement.
    pub fn withdraw(&self, ctx: &CallContext, amount: Amount) {
        let depth = self.depth.get();
        self.depth.set(depth + 1);

        match self.config.withdraw_mode {
            WithdrawMode::InteractionFirst => self.pay_then_debit(ctx.sender, amount, depth),
            WithdrawMode::EffectsFirst => self.debit_then_pay(ctx.sender, amount, depth),
            WithdrawMode::Guarded => {
                if self.reentrancy_guard.acquire() {
                    self.pay_then_debit(ctx.sender, amount, depth);
                    self.reentrancy_guard.release();
                } else {
                    warn!(account = %ctx.sender, %amount, depth, "reentrant withdraw blocked");
                    self.skip(ctx.sender, amount, SkipReason::Reentrant);
                }
            }
        }

        self.depth.set(depth);
    }

    fn pay_then_debit(&self, sender: AccountId, amount: Amount, depth: u32) {
        let recorded = self.balance_of(&sender);
        if amount > recorded {
            debug!(account = %sender, %amount, %recorded, "withdraw exceeds balance, ignored");
            self.skip(sender, amount, SkipReason::InsufficientBalance);
            return;
        }

        debug!(account = %sender, %amount, %recorded, depth, "paying out before debit");
        if let Err(err) = self.bank.send(self.address, sender, amount) {
            self.payout_failed(sender, amount, depth, &err.to_string());
            return;
        }

        // Unwinding frames of a re-entered withdraw debit a balance that an
        // inner frame already took to zero; clamp instead of wrapping.
        let remaining = {
            let mut balances = self.balances.borrow_mut();
            let entry = balances.entry(sender).or_default();
            *entry = entry.saturating_sub(amount);
            *entry
        };
        self.withdrawn(sender, amount, remaining, depth);
    }

    fn debit_then_pay(&self, sender: AccountId, amount: Amount, depth: u32) {
        let Some(remaining) = self.balance_of(&sender).checked_sub(amount) else {
            debug!(account = %sender, %amount, "withdraw exceeds balance, ignored");
            self.skip(sender, amount, SkipReason::InsufficientBalance);
            return;
        };
        self.balances.borrow_mut().insert(sender, remaining);

        if let Err(err) = self.bank.send(self.address, sender, amount) {
            let mut balances = self.balances.borrow_mut();
            let entry = balances.entry(sender).or_default();
            *entry = entry.checked_add(amount).unwrap_or(Amount::MAX);
            drop(balances);
            self.payout_failed(sender, amount, depth, &err.to_string());
            return;
        }

        self.withdrawn(sender, amount, self.balance_of(&sender), depth);
    }

    // ───────────────────────── Events ─────────────────────────

    /// Get all emitted events.
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.borrow().clone()
    }

    /// Drain all events (consume and clear).
    pub fn drain_events(&self) -> Vec<LedgerEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    fn record(&self, event: LedgerEvent) {
        self.events.borrow_mut().push(event);
    }

    fn skip(&self, account: AccountId, amount: Amount, reason: SkipReason) {
        self.record(LedgerEvent::WithdrawSkipped(WithdrawSkipped {
            account,
            amount,
            reason,
        }));
    }

    fn withdrawn(&self, account: AccountId, amount: Amount, remaining: Amount, depth: u32) {
        debug!(%account, %amount, %remaining, depth, "withdrawal settled");
        self.record(LedgerEvent::Withdrawn(Withdrawn {
            account,
            amount,
            remaining,
            depth,
        }));
    }

    fn payout_failed(&self, account: AccountId, amount: Amount, depth: u32, reason: &str) {
        let available = self.total_held();
        warn!(%account, %amount, %available, depth, reason, "payout failed, withdraw aborted");
        self.record(LedgerEvent::TransferFailed(TransferFailed {
            account,
            amount,
            available,
            depth,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::{ExternalAccount, Receivable};
    use crate::errors::TransferError;

    fn setup() -> (Rc<Bank>, Rc<Ledger>) {
        setup_with(LedgerConfig::default())
    }

    fn setup_with(config: LedgerConfig) -> (Rc<Bank>, Rc<Ledger>) {
        let bank = Rc::new(Bank::new());
        let ledger = Ledger::deploy(Rc::clone(&bank), config);
        (bank, ledger)
    }

    fn funded(bank: &Bank, units: u64) -> AccountId {
        let account = AccountId::new();
        bank.credit(account, Amount::units(units)).unwrap();
        account
    }

    fn donate(ledger: &Ledger, from: AccountId, to: AccountId, units: u64) {
        let ctx = CallContext::new(from).with_value(Amount::units(units));
        ledger.donate(&ctx, to).unwrap();
    }

    // ─── Donate tests ───

    #[test]
    fn test_donate_credits_beneficiary() {
        let (bank, ledger) = setup();
        let alice = funded(&bank, 100);
        let bob = AccountId::new();

        donate(&ledger, alice, bob, 10);

        assert_eq!(ledger.balance_of(&bob), Amount::units(10));
        assert_eq!(ledger.balance_of(&alice), Amount::ZERO);
        assert_eq!(ledger.total_held(), Amount::units(10));
        assert_eq!(bank.funds_of(&alice), Amount::units(90));
    }

    #[test]
    fn test_donate_accumulates() {
        let (bank, ledger) = setup();
        let alice = funded(&bank, 100);
        let carol = funded(&bank, 100);
        let bob = AccountId::new();

        donate(&ledger, alice, bob, 10);
        donate(&ledger, carol, bob, 3);

        assert_eq!(ledger.balance_of(&bob), Amount::units(13));
        assert_eq!(ledger.recorded_total(), Amount::units(13));
        ledger.check_invariant().unwrap();
    }

    #[test]
    fn test_donate_zero_is_noop_credit() {
        let (bank, ledger) = setup();
        let alice = funded(&bank, 1);
        let bob = AccountId::new();

        donate(&ledger, alice, bob, 0);

        assert_eq!(ledger.balance_of(&bob), Amount::ZERO);
        assert_eq!(ledger.total_held(), Amount::ZERO);
        assert_eq!(ledger.events().len(), 1);
    }

    #[test]
    fn test_donate_without_funds_changes_nothing() {
        let (bank, ledger) = setup();
        let alice = funded(&bank, 1);
        let bob = AccountId::new();

        let ctx = CallContext::new(alice).with_value(Amount::units(5));
        let result = ledger.donate(&ctx, bob);

        assert!(matches!(
            result,
            Err(LedgerError::Transfer(TransferError::InsufficientFunds { .. }))
        ));
        assert_eq!(ledger.balance_of(&bob), Amount::ZERO);
        assert_eq!(bank.funds_of(&alice), Amount::units(1));
        assert!(ledger.events().is_empty());
    }

    // ─── Balance query tests ───

    #[test]
    fn test_balance_of_unknown_is_zero() {
        let (_bank, ledger) = setup();
        assert_eq!(ledger.balance_of(&AccountId::new()), Amount::ZERO);
    }

    // ─── Withdraw tests ───

    #[test]
    fn test_withdraw_more_than_balance_is_noop() {
        let (bank, ledger) = setup();
        let owner = funded(&bank, 100);
        let alice = AccountId::new();
        donate(&ledger, owner, alice, 10);

        ledger.withdraw(&CallContext::new(alice), Amount::units(15));

        assert_eq!(ledger.balance_of(&alice), Amount::units(10));
        assert_eq!(ledger.total_held(), Amount::units(10));
        assert_eq!(bank.funds_of(&alice), Amount::ZERO);
        assert!(matches!(
            ledger.events().last(),
            Some(LedgerEvent::WithdrawSkipped(WithdrawSkipped {
                reason: SkipReason::InsufficientBalance,
                ..
            }))
        ));
    }

    #[test]
    fn test_withdraw_unknown_account_is_noop() {
        let (bank, ledger) = setup();
        let owner = funded(&bank, 100);
        donate(&ledger, owner, AccountId::new(), 10);
        let bob = AccountId::new();

        ledger.withdraw(&CallContext::new(bob), Amount::units(5));

        assert_eq!(ledger.balance_of(&bob), Amount::ZERO);
        assert_eq!(ledger.total_held(), Amount::units(10));
    }

    #[test]
    fn test_withdraw_within_balance_pays_and_debits() {
        let (bank, ledger) = setup();
        let owner = funded(&bank, 100);
        let alice = ExternalAccount::new();
        donate(&ledger, owner, alice.address(), 10);

        ledger.withdraw(&CallContext::new(alice.address()), Amount::units(8));

        assert_eq!(ledger.balance_of(&alice.address()), Amount::units(2));
        assert_eq!(ledger.total_held(), Amount::units(2));
        assert_eq!(bank.funds_of(&alice.address()), Amount::units(8));
        ledger.check_invariant().unwrap();
        assert!(matches!(
            ledger.events().last(),
            Some(LedgerEvent::Withdrawn(Withdrawn { depth: 0, .. }))
        ));
    }

    #[test]
    fn test_withdraw_ignores_attached_value() {
        let (bank, ledger) = setup();
        let alice = funded(&bank, 10);
        donate(&ledger, alice, alice, 4);

        let ctx = CallContext::new(alice).with_value(Amount::units(3));
        ledger.withdraw(&ctx, Amount::units(4));

        assert_eq!(bank.funds_of(&alice), Amount::units(10));
        assert_eq!(ledger.total_held(), Amount::ZERO);
    }

    #[test]
    fn test_withdraw_with_unbacked_balance_aborts_without_debit() {
        // A recorded balance the pool cannot honour: the payout fails and the
        // record stays untouched.
        let (bank, ledger) = setup();
        let alice = AccountId::new();
        ledger.balances.borrow_mut().insert(alice, Amount::units(5));

        ledger.withdraw(&CallContext::new(alice), Amount::units(5));

        assert_eq!(ledger.balance_of(&alice), Amount::units(5));
        assert_eq!(bank.funds_of(&alice), Amount::ZERO);
        assert!(matches!(
            ledger.events().last(),
            Some(LedgerEvent::TransferFailed(_))
        ));
    }

    #[test]
    fn test_effects_first_refunds_on_failed_payout() {
        let (_bank, ledger) = setup_with(LedgerConfig {
            withdraw_mode: WithdrawMode::EffectsFirst,
        });
        let alice = AccountId::new();
        ledger.balances.borrow_mut().insert(alice, Amount::units(5));

        ledger.withdraw(&CallContext::new(alice), Amount::units(5));

        assert_eq!(ledger.balance_of(&alice), Amount::units(5));
    }

    #[test]
    fn test_effects_first_normal_withdraw() {
        let (bank, ledger) = setup_with(LedgerConfig {
            withdraw_mode: WithdrawMode::EffectsFirst,
        });
        let alice = funded(&bank, 10);
        donate(&ledger, alice, alice, 10);

        ledger.withdraw(&CallContext::new(alice), Amount::units(7));

        assert_eq!(ledger.balance_of(&alice), Amount::units(3));
        assert_eq!(bank.funds_of(&alice), Amount::units(7));
        ledger.check_invariant().unwrap();
    }

    #[test]
    fn test_guarded_mode_releases_guard() {
        let (bank, ledger) = setup_with(LedgerConfig {
            withdraw_mode: WithdrawMode::Guarded,
        });
        let alice = funded(&bank, 10);
        donate(&ledger, alice, alice, 10);

        ledger.withdraw(&CallContext::new(alice), Amount::units(4));
        ledger.withdraw(&CallContext::new(alice), Amount::units(6));

        assert_eq!(ledger.balance_of(&alice), Amount::ZERO);
        assert!(!ledger.reentrancy_guard.is_locked());
    }

    // ─── Invariant tests ───

    #[test]
    fn test_check_invariant_reports_mismatch() {
        let (bank, ledger) = setup();
        bank.credit(ledger.address(), Amount::units(3)).unwrap();

        let result = ledger.check_invariant();
        assert_eq!(
            result,
            Err(LedgerError::InvariantViolation {
                recorded: Amount::ZERO,
                held: Amount::units(3),
            })
        );
        assert!(ledger.is_solvent());
    }

    // ─── Events tests ───

    #[test]
    fn test_drain_events() {
        let (bank, ledger) = setup();
        let alice = funded(&bank, 10);
        donate(&ledger, alice, alice, 1);

        let events = ledger.drain_events();
        assert_eq!(events.len(), 1);
        assert!(ledger.events().is_empty());
    }

    #[test]
    fn test_config_serde_names() {
        let config: LedgerConfig =
            serde_json::from_str(r#"{"withdraw_mode":"effects_first"}"#).unwrap();
        assert_eq!(config.withdraw_mode, WithdrawMode::EffectsFirst);

        let default: LedgerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(default.withdraw_mode, WithdrawMode::InteractionFirst);
    }
}
