//! Money as an integer amount of paisa (1/100 taka).
//!
//! Prices are never floating point internally. Decimal text such as `42.50`
//! is converted at the edge with [`Money::parse_decimal`]; order totals are
//! computed with checked arithmetic so an overflow surfaces as a validation
//! failure instead of wrapping.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Minor units per taka.
pub const PAISA_PER_TAKA: u64 = 100;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// An amount in paisa.
    pub const fn new(paisa: u64) -> Self {
        Self(paisa)
    }

    pub const fn from_taka(taka: u32) -> Self {
        Self(taka as u64 * PAISA_PER_TAKA)
    }

    /// The amount in paisa.
    pub const fn amount(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Parse a plain decimal taka amount with at most two fractional digits.
    ///
    /// Signs, exponents and a third decimal place are rejected.
    pub fn parse_decimal(raw: &str) -> DomainResult<Money> {
        let invalid = || DomainError::validation(format!("{raw:?} is not an amount with at most 2 decimals"));
        let raw_trimmed = raw.trim();
        let (whole, fraction) = match raw_trimmed.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (raw_trimmed, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if fraction.len() > 2 || !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: u64 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| invalid())? };
        let fraction: u64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };
        whole
            .checked_mul(PAISA_PER_TAKA)
            .and_then(|p| p.checked_add(fraction))
            .map(Money)
            .ok_or_else(invalid)
    }

    /// Taka as a JSON-friendly number, e.g. `12750` paisa is `127.5`.
    pub fn as_decimal(self) -> f64 {
        self.0 as f64 / PAISA_PER_TAKA as f64
    }

    /// `self × quantity`, failing on overflow.
    pub fn times(self, quantity: u32) -> DomainResult<Money> {
        self.0
            .checked_mul(u64::from(quantity))
            .map(Money)
            .ok_or_else(|| DomainError::validation("order total overflows"))
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }
}

impl From<u64> for Money {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Renders taka with two decimals: `127.50`.
impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.0 / PAISA_PER_TAKA, self.0 % PAISA_PER_TAKA)
    }
}
