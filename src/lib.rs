//! # parish-records
//!
//! Analysis engine for English parish registers and churchwardens' accounts.
//!
//! Sums pre-decimal currency (pounds, shillings and pence) exactly, builds
//! grouped summaries and shares over disbursement records, and resolves
//! parish names to coordinates through an incrementally grown location cache.
//!
//! ## Architecture
//!
//! - **core**: Foundational types (£sd money, ratios, disbursement records)
//! - **aggregation**: Grouped sums, shares, stable ranking and summary tables
//! - **location**: Location cache, lookup collaborators and the resolver
//! - **demography**: Baptism/burial series, marriage networks and rate-payer cohorts
//! - **simulation**: Synthetic registers for load testing
//! - **config**: Pipeline settings

pub mod aggregation;
pub mod config;
pub mod core;
pub mod demography;
pub mod location;
pub mod simulation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::aggregation::engine::{Aggregation, AggregationEngine, RankBy};
    pub use crate::aggregation::summary::SummaryReport;
    pub use crate::config::PipelineConfig;
    pub use crate::core::money::{CurrencyError, Lsd};
    pub use crate::core::ratio::Ratio;
    pub use crate::core::record::{Disbursement, DisbursementSet, KeyField, RawAmount};
    pub use crate::location::cache::LocationCache;
    pub use crate::location::resolver::{LocationLookup, LookupSession, Resolver};
}
