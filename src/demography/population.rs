use crate::core::ratio::Ratio;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Register counts for one parish in one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationRecord {
    #[serde(default)]
    pub parish: String,
    pub year: i32,
    pub boy_baptisms: u64,
    pub girl_baptisms: u64,
    pub boy_burials: u64,
    pub girl_burials: u64,
}

/// Register counts summed over every parish for one year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct YearCounts {
    pub boy_baptisms: u64,
    pub girl_baptisms: u64,
    pub boy_burials: u64,
    pub girl_burials: u64,
}

impl YearCounts {
    pub fn baptisms(&self) -> u64 {
        self.boy_baptisms + self.girl_baptisms
    }

    pub fn burials(&self) -> u64 {
        self.boy_burials + self.girl_burials
    }

    /// Baptisms minus burials.
    pub fn change(&self) -> i64 {
        self.baptisms() as i64 - self.burials() as i64
    }

    pub fn male_change(&self) -> i64 {
        self.boy_baptisms as i64 - self.boy_burials as i64
    }

    pub fn female_change(&self) -> i64 {
        self.girl_baptisms as i64 - self.girl_burials as i64
    }

    fn add(&mut self, record: &PopulationRecord) {
        self.boy_baptisms += record.boy_baptisms;
        self.girl_baptisms += record.girl_baptisms;
        self.boy_burials += record.boy_burials;
        self.girl_burials += record.girl_burials;
    }
}

/// Which sex a per-sex series covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    Male,
    Female,
}

/// Yearly population movement derived from baptisms and burials.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PopulationSeries {
    years: BTreeMap<i32, YearCounts>,
}

impl PopulationSeries {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a PopulationRecord>) -> Self {
        let mut years: BTreeMap<i32, YearCounts> = BTreeMap::new();
        for record in records {
            years.entry(record.year).or_default().add(record);
        }
        Self { years }
    }

    pub fn years(&self) -> impl Iterator<Item = (i32, &YearCounts)> {
        self.years.iter().map(|(y, c)| (*y, c))
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn annual_change(&self) -> Vec<(i32, i64)> {
        self.years().map(|(y, c)| (y, c.change())).collect()
    }

    /// Baptisms per burial; undefined for years with no burials.
    pub fn baptism_burial_ratio(&self) -> Vec<(i32, Ratio)> {
        self.years()
            .map(|(y, c)| (y, Ratio::of(c.baptisms(), c.burials())))
            .collect()
    }

    pub fn cumulative_change(&self) -> Vec<(i32, i64)> {
        running_total(self.years().map(|(y, c)| (y, c.change())))
    }

    pub fn change_by_sex(&self, sex: Sex) -> Vec<(i32, i64)> {
        self.years()
            .map(|(y, c)| match sex {
                Sex::Male => (y, c.male_change()),
                Sex::Female => (y, c.female_change()),
            })
            .collect()
    }

    pub fn cumulative_change_by_sex(&self, sex: Sex) -> Vec<(i32, i64)> {
        running_total(self.change_by_sex(sex))
    }

    pub fn cumulative_baptisms(&self, sex: Sex) -> Vec<(i32, i64)> {
        running_total(self.years().map(|(y, c)| match sex {
            Sex::Male => (y, c.boy_baptisms as i64),
            Sex::Female => (y, c.girl_baptisms as i64),
        }))
    }

    pub fn cumulative_burials(&self, sex: Sex) -> Vec<(i32, i64)> {
        running_total(self.years().map(|(y, c)| match sex {
            Sex::Male => (y, c.boy_burials as i64),
            Sex::Female => (y, c.girl_burials as i64),
        }))
    }
}

fn running_total(series: impl IntoIterator<Item = (i32, i64)>) -> Vec<(i32, i64)> {
    series
        .into_iter()
        .scan(0i64, |acc, (year, value)| {
            *acc += value;
            Some((year, *acc))
        })
        .collect()
}

impl fmt::Display for PopulationSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Population change ===")?;
        writeln!(
            f,
            "{:>6} {:>9} {:>8} {:>7} {:>10} {:>9}",
            "Year", "Baptisms", "Burials", "Change", "Cumulative", "Ratio"
        )?;
        let cumulative = self.cumulative_change();
        for ((year, counts), (_, total)) in self.years().zip(cumulative) {
            writeln!(
                f,
                "{:>6} {:>9} {:>8} {:>7} {:>10} {:>9}",
                year,
                counts.baptisms(),
                counts.burials(),
                counts.change(),
                total,
                Ratio::of(counts.baptisms(), counts.burials()).to_string()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(parish: &str, year: i32, counts: [u64; 4]) -> PopulationRecord {
        PopulationRecord {
            parish: parish.to_string(),
            year,
            boy_baptisms: counts[0],
            girl_baptisms: counts[1],
            boy_burials: counts[2],
            girl_burials: counts[3],
        }
    }

    fn sample() -> PopulationSeries {
        let records = vec![
            record("A", 1700, [3, 2, 1, 1]),
            record("B", 1700, [1, 0, 0, 1]),
            record("A", 1701, [0, 1, 2, 2]),
            record("A", 1702, [1, 1, 0, 0]),
        ];
        PopulationSeries::from_records(&records)
    }

    #[test]
    fn test_annual_change_sums_parishes() {
        assert_eq!(
            sample().annual_change(),
            vec![(1700, 3), (1701, -3), (1702, 2)]
        );
    }

    #[test]
    fn test_cumulative_change() {
        assert_eq!(
            sample().cumulative_change(),
            vec![(1700, 3), (1701, 0), (1702, 2)]
        );
    }

    #[test]
    fn test_ratio_undefined_without_burials() {
        let ratios = sample().baptism_burial_ratio();
        assert_eq!(ratios[0], (1700, Ratio::Defined(dec!(2))));
        assert_eq!(ratios[2], (1702, Ratio::Undefined));
    }

    #[test]
    fn test_by_sex() {
        let series = sample();
        assert_eq!(
            series.change_by_sex(Sex::Male),
            vec![(1700, 3), (1701, -2), (1702, 1)]
        );
        assert_eq!(
            series.cumulative_change_by_sex(Sex::Female),
            vec![(1700, 0), (1701, -1), (1702, 0)]
        );
        assert_eq!(
            series.cumulative_baptisms(Sex::Male),
            vec![(1700, 4), (1701, 4), (1702, 5)]
        );
        assert_eq!(
            series.cumulative_burials(Sex::Female),
            vec![(1700, 2), (1701, 4), (1702, 4)]
        );
    }
}
