//! Standard disbursement summaries and their plain-text tabulation.
//!
//! Each summary is a composition of [`AggregationEngine`] operations over a
//! [`DisbursementSet`]. Tables only ever carry normalized totals.

use crate::aggregation::engine::{AggregatedGroup, AggregationEngine, AggregationError, RankBy};
use crate::config::PipelineConfig;
use crate::core::money::Lsd;
use crate::core::ratio::Ratio;
use crate::core::record::{DisbursementSet, GroupKey, KeyField};
use log::{info, warn};
use serde::Serialize;
use std::fmt;

const PARISH_YEAR: &[KeyField] = &[KeyField::Parish, KeyField::Year];

/// One row of a summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub key: GroupKey,
    pub total: Lsd,
    /// Pence, for plotting consumers.
    pub base_units: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<Ratio>,
}

impl SummaryRow {
    fn from_group(group: &AggregatedGroup) -> Self {
        Self {
            key: group.key().clone(),
            total: group.total(),
            base_units: group.base_units(),
            percent: None,
        }
    }
}

/// A titled table of grouped totals.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryTable {
    /// Short identifier, used as the output file stem.
    pub name: String,
    pub title: String,
    pub columns: Vec<KeyField>,
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    fn new(name: &str, title: impl Into<String>, columns: &[KeyField]) -> Self {
        Self {
            name: name.to_string(),
            title: title.into(),
            columns: columns.to_vec(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn has_percent(&self) -> bool {
        self.rows.iter().any(|r| r.percent.is_some())
    }
}

impl fmt::Display for SummaryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} ===", self.title)?;

        let mut widths: Vec<usize> = self
            .columns
            .iter()
            .map(|c| c.column_name().len())
            .collect();
        for row in &self.rows {
            for (width, value) in widths.iter_mut().zip(row.key.values()) {
                *width = (*width).max(value.to_string().len());
            }
        }

        for (column, width) in self.columns.iter().zip(&widths) {
            write!(f, "{:<width$}  ", column.column_name(), width = width)?;
        }
        write!(f, "{:>8} {:>9} {:>5}", "Pounds", "Shillings", "Pence")?;
        if self.has_percent() {
            write!(f, " {:>9}", "Percent")?;
        }
        writeln!(f)?;

        for row in &self.rows {
            for (value, width) in row.key.values().iter().zip(&widths) {
                write!(f, "{:<width$}  ", value.to_string(), width = width)?;
            }
            let (pounds, shillings, pence) =
                row.total.to_denomination_columns().map_err(|_| fmt::Error)?;
            write!(f, "{:>8} {:>9} {:>5}", pounds, shillings, pence)?;
            if let Some(percent) = &row.percent {
                write!(f, " {:>9}", percent.to_string())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Total expenditure per parish per year.
pub fn annual_totals(set: &DisbursementSet) -> SummaryTable {
    let agg = AggregationEngine::aggregate(set.disbursements(), PARISH_YEAR);
    let mut table = SummaryTable::new("total_expenditure", "Total annual expenditure", PARISH_YEAR);
    table.rows = agg.groups().map(SummaryRow::from_group).collect();
    table
}

/// Per parish per year, spend on `category` and its percentage of all
/// spend in that parish and year.
///
/// Years with no spend on the category have no row.
pub fn category_share(
    set: &DisbursementSet,
    category: &str,
) -> Result<SummaryTable, AggregationError> {
    let spend = AggregationEngine::aggregate(set.in_category(category), PARISH_YEAR);
    let all = AggregationEngine::aggregate(set.disbursements(), PARISH_YEAR);
    let ratios = AggregationEngine::ratio(&spend, &all, PARISH_YEAR.len())?;

    let mut table = SummaryTable::new(
        &format!("{}_costs", category.to_lowercase()),
        format!("{} expenditure as a percentage of total expenditure", category),
        PARISH_YEAR,
    );
    table.rows = spend
        .groups()
        .filter_map(|group| {
            ratios.get(group.key()).map(|ratio| SummaryRow {
                percent: Some(*ratio),
                ..SummaryRow::from_group(group)
            })
        })
        .collect();
    Ok(table)
}

/// Totals per parish per primary category, largest first within each parish.
pub fn primary_category_ranking(set: &DisbursementSet) -> SummaryTable {
    let fields = [KeyField::Parish, KeyField::PrimaryCategory];
    let groups = AggregationEngine::aggregate(set.disbursements(), &fields).into_groups();
    let ranked = AggregationEngine::rank_within_group(&groups, 1, RankBy::Total, true);

    let mut table = SummaryTable::new(
        "primary_categories",
        "Expenditure by primary category",
        &fields,
    );
    table.rows = ranked.into_iter().map(SummaryRow::from_group).collect();
    table
}

/// Annual totals per parish restricted to one category.
pub fn category_annual_totals(set: &DisbursementSet, category: &str) -> SummaryTable {
    let agg = AggregationEngine::aggregate(set.in_category(category), PARISH_YEAR);
    let mut table = SummaryTable::new(
        &category.to_lowercase(),
        format!("Annual {} expenditure", category.to_lowercase()),
        PARISH_YEAR,
    );
    table.rows = agg.groups().map(SummaryRow::from_group).collect();
    table
}

/// The full set of disbursement summaries.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub tables: Vec<SummaryTable>,
    /// Input indices of records excluded for malformed amounts.
    pub rejected: Vec<usize>,
}

impl SummaryReport {
    pub fn build(set: &DisbursementSet, config: &PipelineConfig) -> Result<Self, AggregationError> {
        // Every summary re-aggregates the same records; report each bad one once here.
        let all = AggregationEngine::aggregate(set.disbursements(), &[]);
        for record in all.rejected() {
            warn!("Skipping record {}: {}", record.index, record.error);
        }
        let rejected = all.rejected().iter().map(|r| r.index).collect::<Vec<_>>();

        let tables = vec![
            category_share(set, &config.funeral_category)?,
            primary_category_ranking(set),
            annual_totals(set),
            category_annual_totals(set, &config.perambulation_category),
        ];

        info!(
            "Built {} summary tables from {} records ({} rejected)",
            tables.len(),
            set.len(),
            rejected.len()
        );
        Ok(Self { tables, rejected })
    }
}

impl fmt::Display for SummaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for table in &self.tables {
            writeln!(f, "{}", table)?;
        }
        if !self.rejected.is_empty() {
            writeln!(f, "Rejected records: {:?}", self.rejected)?;
        }
        Ok(())
    }
}
