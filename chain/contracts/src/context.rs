//! Call context: who is calling and what value rides along.

use types::ids::AccountId;
use types::numeric::Amount;

/// Caller identity and attached value for a single contract call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub sender: AccountId,
    pub value: Amount,
}

impl CallContext {
    /// A call from `sender` with no value attached.
    pub fn new(sender: AccountId) -> Self {
        Self {
            sender,
            value: Amount::ZERO,
        }
    }

    /// Attach `value` to the call.
    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }
}

impl From<AccountId> for CallContext {
    fn from(sender: AccountId) -> Self {
        Self::new(sender)
    }
}
