//! Baptism, burial and marriage registers, and rate-payer rolls.

pub mod marriage;
pub mod population;
pub mod tax;
