//! Rate-payer cohort retention.
//!
//! Each year's rate payers form a cohort. For every later year the table
//! reports the percentage of the cohort that has paid in every year since.

use crate::core::ratio::Ratio;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One name on one year's rate roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatePayerRecord {
    pub year: i32,
    pub name: String,
}

/// Distinct rate payers per year.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RateRolls {
    years: BTreeMap<i32, BTreeSet<String>>,
}

impl RateRolls {
    /// Names are trimmed; blank names are dropped. A year with only blank
    /// names is kept as an empty roll.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a RatePayerRecord>) -> Self {
        let mut years: BTreeMap<i32, BTreeSet<String>> = BTreeMap::new();
        for record in records {
            let roll = years.entry(record.year).or_default();
            let name = record.name.trim();
            if !name.is_empty() {
                roll.insert(name.to_string());
            }
        }
        Self { years }
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.keys().copied()
    }

    pub fn roll(&self, year: i32) -> Option<&BTreeSet<String>> {
        self.years.get(&year)
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Retention of every cohort through every later year.
    ///
    /// A payer who misses a year leaves the cohort for good. An empty cohort
    /// has undefined retention throughout.
    pub fn retention(&self) -> RetentionTable {
        let years: Vec<i32> = self.years().collect();
        let rolls: Vec<&BTreeSet<String>> = self.years.values().collect();

        let cells = rolls
            .iter()
            .enumerate()
            .map(|(i, cohort)| {
                let size = cohort.len() as u64;
                let mut remaining: BTreeSet<&String> = cohort.iter().collect();
                let mut row = vec![None; years.len()];
                row[i] = Some(Ratio::percent(size, size));
                for (j, later) in rolls.iter().enumerate().skip(i + 1) {
                    remaining.retain(|name| later.contains(*name));
                    row[j] = Some(Ratio::percent(remaining.len() as u64, size));
                }
                row
            })
            .collect();

        RetentionTable { years, cells }
    }
}

/// Square table of cohort retention, rows and columns both in year order.
///
/// Cells before a cohort's own year are empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetentionTable {
    years: Vec<i32>,
    cells: Vec<Vec<Option<Ratio>>>,
}

impl RetentionTable {
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    /// Percentage of the `cohort` year's payers still paying in `year`.
    pub fn get(&self, cohort: i32, year: i32) -> Option<Ratio> {
        let row = self.years.iter().position(|y| *y == cohort)?;
        let col = self.years.iter().position(|y| *y == year)?;
        self.cells[row][col]
    }

    pub fn rows(&self) -> impl Iterator<Item = (i32, &[Option<Ratio>])> {
        self.years
            .iter()
            .copied()
            .zip(self.cells.iter().map(Vec::as_slice))
    }
}

impl fmt::Display for RetentionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>6}", "%")?;
        for year in &self.years {
            write!(f, " {:>9}", year)?;
        }
        writeln!(f)?;
        for (cohort, row) in self.rows() {
            write!(f, "{:>6}", cohort)?;
            for cell in row {
                match cell {
                    Some(Ratio::Defined(v)) => write!(f, " {:>9}", v.round_dp(2).to_string())?,
                    _ => write!(f, " {:>9}", "-")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rolls(entries: &[(i32, &str)]) -> RateRolls {
        let records: Vec<RatePayerRecord> = entries
            .iter()
            .map(|(year, name)| RatePayerRecord {
                year: *year,
                name: name.to_string(),
            })
            .collect();
        RateRolls::from_records(&records)
    }

    fn sample() -> RateRolls {
        rolls(&[
            (1790, "Ann Hey"),
            (1790, "John Hey"),
            (1790, "Wm Pratt"),
            (1790, "Sam Lister"),
            (1791, "Ann Hey"),
            (1791, "John Hey"),
            (1791, " Wm Pratt "),
            (1791, "Jos Booth"),
            (1792, "Ann Hey"),
            (1792, "Wm Pratt"),
            (1792, "Sam Lister"),
            (1792, "Jos Booth"),
        ])
    }

    #[test]
    fn test_diagonal_is_whole_cohort() {
        let table = sample().retention();
        for year in [1790, 1791, 1792] {
            assert_eq!(table.get(year, year), Some(Ratio::Defined(dec!(100))));
        }
    }

    #[test]
    fn test_retention_is_running_intersection() {
        let table = sample().retention();
        assert_eq!(table.get(1790, 1791), Some(Ratio::Defined(dec!(75))));
        // Sam Lister returns in 1792 but left the 1790 cohort in 1791
        assert_eq!(table.get(1790, 1792), Some(Ratio::Defined(dec!(50))));
        assert_eq!(table.get(1791, 1792), Some(Ratio::Defined(dec!(75))));
    }

    #[test]
    fn test_earlier_years_are_empty() {
        let table = sample().retention();
        assert_eq!(table.get(1792, 1790), None);
        assert_eq!(table.get(1791, 1790), None);
        assert_eq!(table.get(1800, 1790), None);
    }

    #[test]
    fn test_empty_cohort_is_undefined() {
        let table = rolls(&[(1790, "Ann Hey"), (1791, "  "), (1792, "Ann Hey")]).retention();
        assert_eq!(table.get(1791, 1791), Some(Ratio::Undefined));
        assert_eq!(table.get(1791, 1792), Some(Ratio::Undefined));
        assert_eq!(table.get(1790, 1792), Some(Ratio::Defined(dec!(0))));
    }

    #[test]
    fn test_display() {
        let text = sample().retention().to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].trim_start().starts_with('%'));
        assert!(lines[1].contains("75"));
        assert!(lines[3].trim_start().starts_with("1792"));
        assert!(lines[3].contains('-'));
    }
}
