//! Bank: transferable funds and the synchronous receipt callback
//!
//! The bank holds the actual fund pool of every address, separate from any
//! contract's own bookkeeping. A contract that wants to run code when it is
//! paid registers itself as a [`Receivable`]; [`Bank::send`] invokes that
//! handler before returning to the payer. This is the external-call-with-
//! callback step the ledger's withdrawal depends on.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::debug;
use types::ids::AccountId;
use types::numeric::Amount;

use crate::errors::TransferError;

/// Receipt capability of an address.
///
/// `on_receive` runs synchronously inside [`Bank::send`], after the funds have
/// moved and before the payer resumes. It may call back into any contract,
/// including the payer.
pub trait Receivable {
    /// Address the handler is registered under.
    fn address(&self) -> AccountId;

    /// Called after `amount` was sent to this address by `from`.
    fn on_receive(&self, from: AccountId, amount: Amount);
}

/// Externally owned account: accepts funds and runs no code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalAccount {
    address: AccountId,
}

impl ExternalAccount {
    pub fn new() -> Self {
        Self {
            address: AccountId::new(),
        }
    }
}

impl Default for ExternalAccount {
    fn default() -> Self {
        Self::new()
    }
}

impl Receivable for ExternalAccount {
    fn address(&self) -> AccountId {
        self.address
    }

    fn on_receive(&self, _from: AccountId, _amount: Amount) {}
}

/// Fund pool shared by every contract and account in a simulation.
///
/// Receipt handlers are held weakly so that a contract owning an `Rc<Bank>`
/// does not form a cycle with its own registration. Addresses without a live
/// handler behave like [`ExternalAccount`].
#[derive(Debug, Default)]
pub struct Bank {
    /// Transferable funds: address -> amount
    funds: RefCell<HashMap<AccountId, Amount>>,
    /// Receipt handlers: address -> handler
    receivers: RefCell<HashMap<AccountId, Weak<dyn Receivable>>>,
}

impl Bank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint funds into an address. Used by the orchestration layer at genesis.
    pub fn credit(&self, account: AccountId, amount: Amount) -> Result<(), TransferError> {
        let mut funds = self.funds.borrow_mut();
        let current = funds.get(&account).copied().unwrap_or_default();
        let credited = current
            .checked_add(amount)
            .ok_or(TransferError::Overflow { account })?;
        funds.insert(account, credited);
        Ok(())
    }

    /// Transferable funds of an address; zero if never funded.
    pub fn funds_of(&self, account: &AccountId) -> Amount {
        self.funds
            .borrow()
            .get(account)
            .copied()
            .unwrap_or_default()
    }

    /// Sum of all funds in the pool. Constant across transfers.
    pub fn total_supply(&self) -> Amount {
        self.funds
            .borrow()
            .values()
            .fold(Amount::ZERO, |acc, v| acc.checked_add(*v).unwrap_or(Amount::MAX))
    }

    /// Install `receiver` as the receipt handler for its address.
    pub fn register<R: Receivable + 'static>(&self, receiver: &Rc<R>) {
        let address = receiver.address();
        let handler: Weak<R> = Rc::downgrade(receiver);
        let handler: Weak<dyn Receivable> = handler;
        self.receivers.borrow_mut().insert(address, handler);
        debug!(%address, "receipt handler registered");
    }

    /// Whether `account` currently has a live receipt handler.
    pub fn has_receiver(&self, account: &AccountId) -> bool {
        self.receiver_of(account).is_some()
    }

    /// Move funds without running any recipient code.
    ///
    /// Models value attached to a call. Nothing moves on error.
    pub fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let mut funds = self.funds.borrow_mut();

        let available = funds.get(&from).copied().unwrap_or_default();
        let debited = available
            .checked_sub(amount)
            .ok_or(TransferError::InsufficientFunds {
                account: from,
                required: amount,
                available,
            })?;

        if from == to {
            return Ok(());
        }

        let credited = funds
            .get(&to)
            .copied()
            .unwrap_or_default()
            .checked_add(amount)
            .ok_or(TransferError::Overflow { account: to })?;

        funds.insert(from, debited);
        funds.insert(to, credited);
        debug!(%from, %to, %amount, "funds transferred");
        Ok(())
    }

    /// Move funds, then run the recipient's receipt handler before returning.
    ///
    /// All bank borrows are released before the handler runs, so the handler
    /// may re-enter the payer and trigger further sends.
    pub fn send(&self, from: AccountId, to: AccountId, amount: Amount) -> Result<(), TransferError> {
        self.transfer(from, to, amount)?;

        if let Some(receiver) = self.receiver_of(&to) {
            debug!(%from, %to, %amount, "invoking receipt handler");
            receiver.on_receive(from, amount);
        }
        Ok(())
    }

    fn receiver_of(&self, account: &AccountId) -> Option<Rc<dyn Receivable>> {
        self.receivers.borrow().get(account).and_then(Weak::upgrade)
    }
}
