use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed-point decimal with 4 decimal places, stored as a scaled integer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(from = "f64", into = "f64")]
pub struct Amount(i64);

impl Amount {
    const SCALE: i64 = 10_000;

    pub const ZERO: Amount = Amount(0);

    pub fn from_float(value: f64) -> Self {
        Amount((value * Self::SCALE as f64).round() as i64)
    }

    pub fn from_scaled(value: i64) -> Self {
        Amount(value)
    }

    pub fn from_whole(value: i64) -> Self {
        Amount(value * Self::SCALE)
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Price after taking `rate` off, rounded half away from zero.
    pub fn discounted(self, rate: Rate) -> Amount {
        let keep = i128::from(Rate::SCALE.saturating_sub(rate.0));
        let scaled = i128::from(self.0) * keep;
        let half = i128::from(Rate::SCALE) / 2;
        let rounded = if scaled >= 0 {
            (scaled + half) / i128::from(Rate::SCALE)
        } else {
            (scaled - half) / i128::from(Rate::SCALE)
        };
        Amount(rounded as i64)
    }

    /// How many whole `unit`s fit in this amount. Non-positive inputs yield 0.
    pub fn whole_units_of(self, unit: Amount) -> u64 {
        if self.0 <= 0 || unit.0 <= 0 {
            return 0;
        }
        (self.0 / unit.0) as u64
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    /// Value of `count` items priced at `self` each, saturating on overflow.
    pub fn times(self, count: u64) -> Amount {
        let count = i64::try_from(count).unwrap_or(i64::MAX);
        Amount(self.0.saturating_mul(count))
    }
}

impl From<f64> for Amount {
    fn from(value: f64) -> Self {
        Amount::from_float(value)
    }
}

impl From<Amount> for f64 {
    fn from(value: Amount) -> Self {
        value.0 as f64 / Amount::SCALE as f64
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        let whole = abs / Self::SCALE;
        let frac = abs % Self::SCALE;
        write!(f, "{sign}{whole}.{frac:04}")
    }
}

impl std::ops::Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Amount {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Amount(self.0 - rhs.0)
    }
}

impl std::ops::AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::ops::SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

/// A fraction in `[0, 1)`, stored in hundredths of a percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Rate(u32);

#[derive(Debug, Error, PartialEq)]
#[error("rate {0} is outside [0, 1)")]
pub struct RateError(pub f64);

impl Rate {
    const SCALE: u32 = 10_000;

    pub const ZERO: Rate = Rate(0);

    pub fn from_fraction(value: f64) -> Result<Self, RateError> {
        if !(0.0..1.0).contains(&value) {
            return Err(RateError(value));
        }
        Ok(Rate((value * Self::SCALE as f64).round() as u32))
    }

    pub fn from_scaled(value: u32) -> Self {
        Rate(value)
    }
}

impl TryFrom<f64> for Rate {
    type Error = RateError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Rate::from_fraction(value)
    }
}

impl From<Rate> for f64 {
    fn from(value: Rate) -> Self {
        value.0 as f64 / Rate::SCALE as f64
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        write!(f, "{whole}.{frac:02}%")
    }
}
