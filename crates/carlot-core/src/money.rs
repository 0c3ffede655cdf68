//! # Money Module
//!
//! Integer money in the smallest currency unit.
//!
//! Every amount in Carlot (daily rates, sale prices, booking totals, payment
//! and refund amounts) is an `i64` count of minor units (paise, cents). The
//! gateway's order API takes minor units directly, so no float conversion
//! ever happens between pricing and order creation.
//!
//! ```rust
//! use carlot_core::money::Money;
//!
//! let daily = Money::from_minor(100_00);
//! let total = daily.checked_mul(3).unwrap();
//! assert_eq!(total.minor(), 300_00);
//! assert_eq!(total.to_string(), "300.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// A monetary value in minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Multiplies by a count, returning `None` on overflow.
    pub fn checked_mul(&self, factor: i64) -> Option<Money> {
        self.0.checked_mul(factor).map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}
