use serde::{Deserialize, Serialize};
use std::fmt;

/// Whole reward points. Points are never fractional; any rate-scaled
/// amount is floored before it enters the ledger.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct PointAmount(u64);

impl PointAmount {
    pub const ZERO: Self = Self(0);

    pub fn new(points: u64) -> Self {
        Self(points)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(&self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(&self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Scale by a fractional rate, flooring the result. Negative rates
    /// are treated as zero.
    pub fn scaled_by(&self, rate: f64) -> Self {
        let rate = rate.max(0.0);
        Self((self.0 as f64 * rate).floor() as u64)
    }
}

impl fmt::Display for PointAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} pt", self.0)
    }
}

impl std::iter::Sum for PointAmount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, x| acc.saturating_add(x))
    }
}
