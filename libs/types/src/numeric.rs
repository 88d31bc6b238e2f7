//! Fixed-point currency amounts
//!
//! An [`Amount`] is an unsigned count of base units with [`DECIMALS`] implied
//! decimal places (one whole unit is 10^18 base units, like wei per ether).
//! All ledger arithmetic is integer arithmetic on base units; `rust_decimal`
//! is the bridge for human-facing decimal values such as scenario configs.
//!
//! Text form is whole units (`"10"`, `"0.5"`), and serde uses the same form so
//! configs and reports stay readable.

use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::AmountError;

/// Number of implied decimal places in an [`Amount`].
pub const DECIMALS: u32 = 18;

/// Base units per whole unit.
const UNIT: u128 = 10u128.pow(DECIMALS);

/// Non-negative currency amount in base units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);
    pub const MAX: Amount = Amount(u128::MAX);

    /// Create from a raw base-unit count.
    pub const fn from_base_units(base_units: u128) -> Self {
        Self(base_units)
    }

    /// Raw base-unit count.
    pub const fn base_units(self) -> u128 {
        self.0
    }

    /// `units` whole currency units.
    pub const fn units(units: u64) -> Self {
        Self(units as u128 * UNIT)
    }

    /// Convert an exact decimal value of whole units.
    ///
    /// Rejects negative values and values with more than [`DECIMALS`]
    /// fractional digits instead of rounding them.
    pub fn from_decimal(value: Decimal) -> Result<Self, AmountError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(AmountError::Negative {
                value: value.to_string(),
            });
        }

        let normalized = value.normalize();
        let scale = normalized.scale();
        if scale > DECIMALS {
            return Err(AmountError::TooPrecise {
                value: value.to_string(),
                max_decimals: DECIMALS,
            });
        }

        normalized
            .mantissa()
            .unsigned_abs()
            .checked_mul(10u128.pow(DECIMALS - scale))
            .map(Self)
            .ok_or_else(|| AmountError::Overflow {
                value: value.to_string(),
            })
    }

    /// Whole-unit decimal value, or `None` beyond `Decimal`'s 96-bit mantissa.
    pub fn to_decimal(self) -> Option<Decimal> {
        let raw = i128::try_from(self.0).ok()?;
        Decimal::try_from_i128_with_scale(raw, DECIMALS)
            .ok()
            .map(|d| d.normalize())
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    pub fn saturating_sub(self, rhs: Amount) -> Amount {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// How many whole `rhs` amounts fit in `self`; `None` when `rhs` is zero.
    pub fn checked_div_floor(self, rhs: Amount) -> Option<u128> {
        self.0.checked_div(rhs.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / UNIT;
        let frac = self.0 % UNIT;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{frac:018}");
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    /// Parse whole units (`"31"`, `"0.25"`) exactly over the full `u128` range.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let invalid = || AmountError::Invalid {
            input: s.to_string(),
        };

        if input.starts_with('-') {
            return Err(AmountError::Negative {
                value: input.to_string(),
            });
        }

        let (whole, frac) = match input.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (input, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let frac = frac.trim_end_matches('0');
        if frac.len() > DECIMALS as usize {
            return Err(AmountError::TooPrecise {
                value: input.to_string(),
                max_decimals: DECIMALS,
            });
        }

        let overflow = || AmountError::Overflow {
            value: input.to_string(),
        };
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let frac_units: u128 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{frac:0<18}");
            padded.parse().map_err(|_| invalid())?
        };

        whole
            .checked_mul(UNIT)
            .and_then(|base| base.checked_add(frac_units))
            .map(Self)
            .ok_or_else(overflow)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}
