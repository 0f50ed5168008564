use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use std::fmt;
use std::str::FromStr;

/// Number of minor units in one coin
pub const MINOR_UNITS_PER_COIN: u64 = 100;

const MINOR_DIGITS: usize = 2;

/// Errors that can occur while parsing an amount
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount is empty")]
    Empty,

    #[error("Invalid amount: {0}")]
    Invalid(String),

    #[error("Too many decimal places in {0}: at most 2 allowed")]
    TooPrecise(String),

    #[error("Amount out of range: {0}")]
    Overflow(String),
}

/// A non-negative quantity of coins, stored as integer minor units.
///
/// Amounts serialize as their minor-unit integer, which keeps every hash that
/// covers an amount identical across platforms.
#[repr(transparent)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    ToSchema,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Creates an amount of whole coins
    ///
    /// Counts above `u64::MAX / 100` coins are clamped to the largest
    /// representable amount; use [`Amount::checked_coins`] to detect that.
    pub const fn coins(coins: u64) -> Self {
        Amount(coins.saturating_mul(MINOR_UNITS_PER_COIN))
    }

    /// Creates an amount of whole coins, or `None` if it does not fit
    pub const fn checked_coins(coins: u64) -> Option<Self> {
        match coins.checked_mul(MINOR_UNITS_PER_COIN) {
            Some(minor_units) => Some(Amount(minor_units)),
            None => None,
        }
    }

    pub const fn from_minor(minor_units: u64) -> Self {
        Amount(minor_units)
    }

    pub const fn minor_units(&self) -> u64 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02}",
            self.0 / MINOR_UNITS_PER_COIN,
            self.0 % MINOR_UNITS_PER_COIN
        )
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    /// Parses `"12"`, `"12.5"` or `"12.34"` as coins.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountError::Empty);
        }

        let (whole, fraction) = match s.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (s, ""),
        };

        let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !is_digits(whole) || !is_digits(fraction) {
            return Err(AmountError::Invalid(s.to_string()));
        }
        if fraction.len() > MINOR_DIGITS {
            return Err(AmountError::TooPrecise(s.to_string()));
        }

        let whole: u64 = whole
            .parse()
            .map_err(|_| AmountError::Overflow(s.to_string()))?;
        let mut minor: u64 = 0;
        for (position, digit) in fraction.bytes().enumerate() {
            let scale = 10u64.pow((MINOR_DIGITS - 1 - position) as u32);
            minor += u64::from(digit - b'0') * scale;
        }

        whole
            .checked_mul(MINOR_UNITS_PER_COIN)
            .and_then(|units| units.checked_add(minor))
            .map(Amount)
            .ok_or_else(|| AmountError::Overflow(s.to_string()))
    }
}

/// A signed running total of coins for one address.
///
/// Balances are derived from history and can dip below zero when two
/// pending transactions jointly overdraw a sender.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balance(i128);

impl Balance {
    pub const ZERO: Balance = Balance(0);

    pub const fn from_minor(minor_units: i128) -> Self {
        Balance(minor_units)
    }

    pub const fn minor_units(&self) -> i128 {
        self.0
    }

    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Checks whether this balance can pay `amount`
    pub fn covers(&self, amount: Amount) -> bool {
        self.0 >= i128::from(amount.0)
    }

    pub fn credit(&mut self, amount: Amount) {
        self.0 += i128::from(amount.0);
    }

    pub fn debit(&mut self, amount: Amount) {
        self.0 -= i128::from(amount.0);
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Balance(i128::from(amount.0))
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        let per_coin = u128::from(MINOR_UNITS_PER_COIN);
        write!(f, "{}{}.{:02}", sign, magnitude / per_coin, magnitude % per_coin)
    }
}
