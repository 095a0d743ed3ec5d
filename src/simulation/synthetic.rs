//! Synthetic disbursement registers.
//!
//! Generates random churchwardens' accounts to exercise aggregation at
//! volumes well beyond the surviving records.

use crate::core::record::{Disbursement, DisbursementSet, RawAmount};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Configuration for generating a random register.
#[derive(Debug, Clone)]
pub struct RegisterConfig {
    pub parish_count: usize,
    pub records_per_parish: usize,
    /// (category, primary category) pairs to draw from.
    pub categories: Vec<(String, String)>,
    pub first_year: i32,
    pub last_year: i32,
    /// Largest pounds value of a single entry.
    pub max_pounds: i64,
    /// Fraction of entries given a negative field, in `[0, 1]`.
    pub invalid_rate: f64,
    /// Fixed seed for reproducible registers.
    pub seed: Option<u64>,
}

impl Default for RegisterConfig {
    fn default() -> Self {
        let categories = [
            ("Funeral", "Poor relief"),
            ("Clothing", "Poor relief"),
            ("Perambulation", "Parish business"),
            ("Visitation", "Parish business"),
            ("Bell ropes", "Fabric"),
            ("Glazing", "Fabric"),
        ];
        Self {
            parish_count: 5,
            records_per_parish: 50,
            categories: categories
                .iter()
                .map(|(c, p)| (c.to_string(), p.to_string()))
                .collect(),
            first_year: 1700,
            last_year: 1760,
            max_pounds: 5,
            invalid_rate: 0.0,
            seed: None,
        }
    }
}

/// Generate a random disbursement register.
///
/// Shillings and pence are drawn past their carry points so the register
/// contains unnormalized entries, as transcribed accounts do.
pub fn generate_register(config: &RegisterConfig) -> DisbursementSet {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let parishes: Vec<String> = (0..config.parish_count)
        .map(|i| format!("Parish {:03}", i))
        .collect();
    let (first_year, last_year) = if config.first_year <= config.last_year {
        (config.first_year, config.last_year)
    } else {
        (config.last_year, config.first_year)
    };

    let mut set = DisbursementSet::new();
    if config.categories.is_empty() {
        return set;
    }

    for parish in &parishes {
        for _ in 0..config.records_per_parish {
            let year = rng.gen_range(first_year..=last_year);
            let date = NaiveDate::from_ymd_opt(year, rng.gen_range(1..=12), rng.gen_range(1..=28));
            let Some(date) = date else {
                continue;
            };
            let (category, primary) = &config.categories[rng.gen_range(0..config.categories.len())];

            let mut amount = RawAmount::new(
                rng.gen_range(0..=config.max_pounds.max(0)),
                rng.gen_range(0..30),
                rng.gen_range(0..24),
            );
            if config.invalid_rate > 0.0 && rng.gen_bool(config.invalid_rate.min(1.0)) {
                amount.pence = -amount.pence - 1;
            }

            set.add(Disbursement::new(parish.clone(), date, category, primary, amount));
        }
    }

    set
}
