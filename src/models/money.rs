//! Integer-cent money and basis-point discounts.
//!
//! Prices are never held as floats: a resolved price must reproduce the
//! billed amount exactly when re-run for audit.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// An amount in euro cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// `Money::new(125, 0)` is 125.00.
    pub const fn new(units: i64, cents: i64) -> Self {
        Self(units * 100 + cents)
    }

    pub const fn cents(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

/// A discount in basis points (1250 = 12.50%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Discount(u32);

impl Discount {
    pub const MAX_BPS: u32 = 10_000;

    pub fn from_bps(bps: u32) -> Option<Self> {
        (bps <= Self::MAX_BPS).then_some(Self(bps))
    }

    pub fn from_percent(percent: u32) -> Option<Self> {
        Self::from_bps(percent.checked_mul(100)?)
    }

    pub fn bps(&self) -> u32 {
        self.0
    }

    /// `base * (1 - discount/100)`, rounded half-up to the cent.
    pub fn apply(&self, base: Money) -> Money {
        let remaining = i128::from(Self::MAX_BPS - self.0);
        let scaled = i128::from(base.cents()) * remaining;
        let half = i128::from(Self::MAX_BPS / 2);
        Money::from_cents(((scaled + half) / i128::from(Self::MAX_BPS)) as i64)
    }
}

impl fmt::Display for Discount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

/// Final price for a base price and an optional discount.
pub fn final_price(base: Money, discount: Option<Discount>) -> Money {
    discount.map_or(base, |d| d.apply(base))
}
