use crate::core::money::{CurrencyError, Lsd};
use crate::core::ratio::Ratio;
use crate::core::record::{Disbursement, GroupKey, KeyField};
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors arising from combining aggregated groups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    #[error("ratio for {key} is undefined: denominator is zero")]
    UndefinedRatio { key: GroupKey },
    #[error("join prefix of {prefix_len} fields exceeds the {available} grouping fields available")]
    PrefixTooLong { prefix_len: usize, available: usize },
    #[error("denominator total for {key} overflows the pence range")]
    Overflow { key: GroupKey },
}

/// A record excluded from aggregation, with its position in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRecord {
    pub index: usize,
    pub error: CurrencyError,
}

/// The summed value of every record sharing one key tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedGroup {
    key: GroupKey,
    base_units: u64,
    total: Lsd,
    record_count: usize,
    first_index: usize,
}

impl AggregatedGroup {
    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    /// Summed value in pence.
    pub fn base_units(&self) -> u64 {
        self.base_units
    }

    /// Summed value, always normalized.
    pub fn total(&self) -> Lsd {
        self.total
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Input position of the first record that contributed to this group.
    pub fn first_index(&self) -> usize {
        self.first_index
    }
}

/// Output of [`AggregationEngine::aggregate`]: groups in key order plus the
/// records that could not be counted.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    fields: Vec<KeyField>,
    groups: BTreeMap<GroupKey, AggregatedGroup>,
    rejected: Vec<RejectedRecord>,
}

impl Aggregation {
    /// Grouping fields, in key order.
    pub fn fields(&self) -> &[KeyField] {
        &self.fields
    }

    pub fn get(&self, key: &GroupKey) -> Option<&AggregatedGroup> {
        self.groups.get(key)
    }

    /// Groups in ascending key order.
    pub fn groups(&self) -> impl Iterator<Item = &AggregatedGroup> {
        self.groups.values()
    }

    pub fn into_groups(self) -> Vec<AggregatedGroup> {
        self.groups.into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn rejected(&self) -> &[RejectedRecord] {
        &self.rejected
    }

    /// Sum over all groups in pence.
    pub fn total_base_units(&self) -> u64 {
        self.groups
            .values()
            .fold(0u64, |acc, g| acc.saturating_add(g.base_units))
    }
}

/// What to order groups by when ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankBy {
    Total,
    RecordCount,
}

/// Grouping, ratio and ranking over disbursement records.
///
/// All operations are pure: they read their inputs and build new values.
pub struct AggregationEngine;

impl AggregationEngine {
    /// Sum records per distinct key tuple.
    ///
    /// Each record is converted to pence before summing, so the result is
    /// independent of input order. Records with invalid currency fields are
    /// reported in [`Aggregation::rejected`] and skipped.
    pub fn aggregate<'a, I>(records: I, fields: &[KeyField]) -> Aggregation
    where
        I: IntoIterator<Item = &'a Disbursement>,
    {
        // key -> (pence, count, first index)
        let mut sums: BTreeMap<GroupKey, (u64, usize, usize)> = BTreeMap::new();
        let mut rejected = Vec::new();

        for (index, record) in records.into_iter().enumerate() {
            let pence = match record.amount.to_lsd() {
                Ok(value) => value.to_base_units(),
                Err(error) => {
                    debug!("Skipping record {}: {}", index, error);
                    rejected.push(RejectedRecord { index, error });
                    continue;
                }
            };

            let key = record.group_key(fields);
            let entry = sums.entry(key).or_insert((0, 0, index));
            match entry.0.checked_add(pence) {
                Some(sum) => {
                    entry.0 = sum;
                    entry.1 += 1;
                }
                None => {
                    debug!("Skipping record {}: group total overflows", index);
                    rejected.push(RejectedRecord {
                        index,
                        error: CurrencyError::SumOverflow,
                    });
                }
            }
        }

        let groups = sums
            .into_iter()
            .map(|(key, (base_units, record_count, first_index))| {
                let group = AggregatedGroup {
                    key: key.clone(),
                    base_units,
                    total: Lsd::from_base_units(base_units),
                    record_count,
                    first_index,
                };
                (key, group)
            })
            .collect::<BTreeMap<_, _>>();

        debug!(
            "Aggregated into {} groups by {:?}, {} rejected",
            groups.len(),
            fields,
            rejected.len()
        );

        Aggregation {
            fields: fields.to_vec(),
            groups,
            rejected,
        }
    }

    /// Percentage of each numerator group relative to the denominator group
    /// sharing its first `prefix_len` key values.
    ///
    /// Denominator groups with longer keys are summed per prefix first.
    /// Numerator groups with no matching denominator are dropped: a share
    /// without a reference total is not reported. A zero denominator yields
    /// [`Ratio::Undefined`].
    pub fn ratio(
        numerator: &Aggregation,
        denominator: &Aggregation,
        prefix_len: usize,
    ) -> Result<BTreeMap<GroupKey, Ratio>, AggregationError> {
        let available = numerator.fields.len().min(denominator.fields.len());
        if prefix_len > available {
            return Err(AggregationError::PrefixTooLong {
                prefix_len,
                available,
            });
        }

        let mut reference: BTreeMap<GroupKey, u64> = BTreeMap::new();
        for group in denominator.groups() {
            let Some(prefix) = group.key.prefix(prefix_len) else {
                continue;
            };
            let slot = reference.entry(prefix.clone()).or_insert(0);
            *slot = slot
                .checked_add(group.base_units)
                .ok_or(AggregationError::Overflow { key: prefix })?;
        }

        let mut ratios = BTreeMap::new();
        let mut dropped = 0usize;
        for group in numerator.groups() {
            let denominator_units = group
                .key
                .prefix(prefix_len)
                .and_then(|prefix| reference.get(&prefix).copied());
            match denominator_units {
                Some(units) => {
                    ratios.insert(group.key.clone(), Ratio::percent(group.base_units, units));
                }
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            debug!("Dropped {} groups with no matching denominator", dropped);
        }
        Ok(ratios)
    }

    /// Unwrap ratios into plain percentages, failing on the first undefined one.
    pub fn defined_percentages(
        ratios: &BTreeMap<GroupKey, Ratio>,
    ) -> Result<BTreeMap<GroupKey, Decimal>, AggregationError> {
        ratios
            .iter()
            .map(|(key, ratio)| {
                ratio
                    .value()
                    .map(|v| (key.clone(), v))
                    .ok_or_else(|| AggregationError::UndefinedRatio { key: key.clone() })
            })
            .collect()
    }

    /// Order groups by partition (the first `partition_len` key values,
    /// ascending), then by `by` within each partition.
    ///
    /// Ties go to the group whose first record came earliest in the
    /// aggregated input. The sort is stable beyond that.
    pub fn rank_within_group<'a>(
        groups: &'a [AggregatedGroup],
        partition_len: usize,
        by: RankBy,
        descending: bool,
    ) -> Vec<&'a AggregatedGroup> {
        let partition = |g: &'a AggregatedGroup| {
            let values = g.key.values();
            &values[..partition_len.min(values.len())]
        };
        let metric = |g: &AggregatedGroup| match by {
            RankBy::Total => g.base_units,
            RankBy::RecordCount => g.record_count as u64,
        };

        let mut ranked: Vec<&AggregatedGroup> = groups.iter().collect();
        ranked.sort_by(|&a, &b| {
            partition(a).cmp(partition(b)).then_with(|| {
                let ord = metric(a).cmp(&metric(b));
                if descending {
                    ord.reverse()
                } else {
                    ord
                }
            })
            .then_with(|| a.first_index.cmp(&b.first_index))
        });
        ranked
    }
}
