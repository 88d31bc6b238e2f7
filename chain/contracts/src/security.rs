//! Shared security primitives for contract modules
//!
//! Ledger entry points take `&self` because a withdrawal can be re-entered
//! from inside its own payout, so the guard keeps its flag in a `Cell`.

use std::cell::Cell;

/// Reentrancy guard preventing nested calls into protected functions.
///
/// A contract function acquires the guard before executing state-changing
/// logic and releases it on completion. Any nested call attempt fails.
/// The ledger only wires this in for `WithdrawMode::Guarded`; the default
/// mode runs without it.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    locked: Cell<bool>,
}

impl ReentrancyGuard {
    /// Create a new unlocked guard.
    pub fn new() -> Self {
        Self {
            locked: Cell::new(false),
        }
    }

    /// Acquire the guard. Returns `true` if successfully acquired.
    /// Returns `false` if already locked (reentrancy attempt).
    pub fn acquire(&self) -> bool {
        !self.locked.replace(true)
    }

    /// Release the guard.
    pub fn release(&self) {
        self.locked.set(false);
    }

    /// Check if currently locked.
    pub fn is_locked(&self) -> bool {
        self.locked.get()
    }
}
