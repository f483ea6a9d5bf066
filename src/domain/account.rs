use crate::error::{Result, WagerError};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Sub;
use std::str::FromStr;

pub type UserId = u64;

/// Number of fractional digits amounts carry across the engine boundary.
pub const AMOUNT_SCALE: u32 = 8;

pub const DEFAULT_CURRENCY: &str = "BTC";

/// Truncates a computed value (payout, multiplied stake) to the ledger scale.
pub fn round_amount(value: Decimal) -> Decimal {
    value
        .round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::ToZero)
        .normalize()
}

/// `stake * multiplier` at ledger scale, or `None` if it does not fit a `Decimal`.
pub fn payout_for(stake: Amount, multiplier: Decimal) -> Option<Decimal> {
    stake.value().checked_mul(multiplier).map(round_amount)
}

/// A user's spendable funds.
///
/// Wraps `rust_decimal::Decimal` so balances never pass through binary floating point.
/// Credits go through `credit`, which refuses to overflow. Going below zero is
/// only possible via `Sub`, and the stores refuse to persist a negative value.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

/// A strictly positive monetary amount with at most 8 fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        let value = value.normalize();
        if value <= Decimal::ZERO {
            return Err(WagerError::ValidationError(
                "Amount must be positive".to_string(),
            ));
        }
        if value.scale() > AMOUNT_SCALE {
            return Err(WagerError::ValidationError(format!(
                "Amount must have at most {} fractional digits",
                AMOUNT_SCALE
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl FromStr for Amount {
    type Err = WagerError;

    fn from_str(s: &str) -> Result<Self> {
        let value = Decimal::from_str(s.trim()).map_err(|_| {
            WagerError::ValidationError(format!("Amount '{}' is not a decimal number", s.trim()))
        })?;
        Self::new(value)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = WagerError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Returns the balance left after paying `amount`, or `InsufficientFunds`.
    pub fn debit(self, amount: Amount) -> Result<Self> {
        if self.0 >= amount.value() {
            Ok(Self(self.0 - amount.value()))
        } else {
            Err(WagerError::InsufficientFunds {
                available: self.0,
                required: amount.value(),
            })
        }
    }

    /// Returns the balance after receiving `amount`, failing instead of overflowing.
    pub fn credit(self, amount: Decimal) -> Result<Self> {
        self.0.checked_add(amount).map(Self).ok_or_else(|| {
            WagerError::ValidationError(format!(
                "Crediting {} would exceed the largest representable balance",
                amount
            ))
        })
    }

    pub fn covers(&self, amount: Amount) -> bool {
        self.0 >= amount.value()
    }
}

impl Sub for Balance {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// One balance row per user.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct BalanceRecord {
    pub user_id: UserId,
    pub amount: Balance,
    pub currency: String,
}

impl BalanceRecord {
    pub fn new(user_id: UserId, currency: impl Into<String>) -> Self {
        Self {
            user_id,
            amount: Balance::ZERO,
            currency: currency.into(),
        }
    }
}
