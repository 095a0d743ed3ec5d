use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Quotient of two counts, or an explicit marker that it is undefined.
///
/// A zero denominator never produces zero, infinity or NaN; it produces
/// [`Ratio::Undefined`] so that "nothing spent" and "cannot compute" stay
/// distinguishable downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Ratio {
    Defined(Decimal),
    Undefined,
}

impl Ratio {
    /// `numerator / denominator`.
    pub fn of(numerator: u64, denominator: u64) -> Self {
        if denominator == 0 {
            return Ratio::Undefined;
        }
        Ratio::Defined(Decimal::from(numerator) / Decimal::from(denominator))
    }

    /// `100 * numerator / denominator`.
    pub fn percent(numerator: u64, denominator: u64) -> Self {
        match Self::of(numerator, denominator) {
            Ratio::Defined(v) => Ratio::Defined(v * Decimal::ONE_HUNDRED),
            Ratio::Undefined => Ratio::Undefined,
        }
    }

    pub fn value(&self) -> Option<Decimal> {
        match self {
            Ratio::Defined(v) => Some(*v),
            Ratio::Undefined => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Ratio::Defined(_))
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ratio::Defined(v) => write!(f, "{}", v.round_dp(2)),
            Ratio::Undefined => write!(f, "undefined"),
        }
    }
}
