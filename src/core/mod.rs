//! Foundational value types: money, ratios and transaction records.

pub mod money;
pub mod ratio;
pub mod record;
