use crate::core::money::{CurrencyError, Lsd};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency fields exactly as supplied by a record source.
///
/// Validation into an [`Lsd`] is deferred to aggregation so a single bad
/// record is reported and skipped rather than failing the load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAmount {
    pub pounds: i64,
    pub shillings: i64,
    pub pence: i64,
}

impl RawAmount {
    pub fn new(pounds: i64, shillings: i64, pence: i64) -> Self {
        Self {
            pounds,
            shillings,
            pence,
        }
    }

    pub fn to_lsd(&self) -> Result<Lsd, CurrencyError> {
        Lsd::new(self.pounds, self.shillings, self.pence)
    }
}

/// A single churchwardens' disbursement entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disbursement {
    pub parish: String,
    pub date: NaiveDate,
    /// Standardized category, e.g. "Funeral" or "Perambulation".
    pub category: String,
    pub primary_category: String,
    #[serde(flatten)]
    pub amount: RawAmount,
}

impl Disbursement {
    pub fn new(
        parish: impl Into<String>,
        date: NaiveDate,
        category: impl Into<String>,
        primary_category: impl Into<String>,
        amount: RawAmount,
    ) -> Self {
        Self {
            parish: parish.into(),
            date,
            category: category.into(),
            primary_category: primary_category.into(),
            amount,
        }
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// Value of one grouping field for this record.
    pub fn key_value(&self, field: KeyField) -> KeyValue {
        match field {
            KeyField::Parish => KeyValue::Text(self.parish.clone()),
            KeyField::Year => KeyValue::Year(self.year()),
            KeyField::Category => KeyValue::Text(self.category.clone()),
            KeyField::PrimaryCategory => KeyValue::Text(self.primary_category.clone()),
        }
    }

    pub fn group_key(&self, fields: &[KeyField]) -> GroupKey {
        GroupKey(fields.iter().map(|f| self.key_value(*f)).collect())
    }
}

/// Fields a disbursement can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyField {
    Parish,
    Year,
    Category,
    PrimaryCategory,
}

impl KeyField {
    pub fn column_name(&self) -> &'static str {
        match self {
            KeyField::Parish => "Parish",
            KeyField::Year => "Year",
            KeyField::Category => "Category",
            KeyField::PrimaryCategory => "Primary category",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyValue {
    Year(i32),
    Text(String),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Year(y) => write!(f, "{}", y),
            KeyValue::Text(t) => write!(f, "{}", t),
        }
    }
}

impl From<&str> for KeyValue {
    fn from(s: &str) -> Self {
        KeyValue::Text(s.to_string())
    }
}

impl From<i32> for KeyValue {
    fn from(y: i32) -> Self {
        KeyValue::Year(y)
    }
}

/// Ordered tuple of grouping values identifying an aggregated group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(pub Vec<KeyValue>);

impl GroupKey {
    pub fn new(values: impl IntoIterator<Item = KeyValue>) -> Self {
        Self(values.into_iter().collect())
    }

    pub fn values(&self) -> &[KeyValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first `len` values, or `None` if the key is shorter.
    pub fn prefix(&self, len: usize) -> Option<GroupKey> {
        self.0.get(..len).map(|v| GroupKey(v.to_vec()))
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        write!(f, "({})", parts.join(", "))
    }
}

/// An ordered collection of disbursement records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisbursementSet {
    disbursements: Vec<Disbursement>,
}

impl DisbursementSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, disbursement: Disbursement) {
        self.disbursements.push(disbursement);
    }

    pub fn disbursements(&self) -> &[Disbursement] {
        &self.disbursements
    }

    pub fn len(&self) -> usize {
        self.disbursements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.disbursements.is_empty()
    }

    /// Records whose standardized category is exactly `category`.
    pub fn in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Disbursement> {
        self.disbursements
            .iter()
            .filter(move |d| d.category == category)
    }

    /// All unique parishes, sorted.
    pub fn parishes(&self) -> Vec<String> {
        let mut parishes: Vec<String> =
            self.disbursements.iter().map(|d| d.parish.clone()).collect();
        parishes.sort();
        parishes.dedup();
        parishes
    }
}

impl FromIterator<Disbursement> for DisbursementSet {
    fn from_iter<T: IntoIterator<Item = Disbursement>>(iter: T) -> Self {
        Self {
            disbursements: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Disbursement {
        Disbursement::new(
            "St Mary",
            NaiveDate::from_ymd_opt(1741, 4, 12).unwrap(),
            "Funeral",
            "Poor relief",
            RawAmount::new(0, 2, 6),
        )
    }

    #[test]
    fn test_year_from_date() {
        assert_eq!(sample().year(), 1741);
    }

    #[test]
    fn test_group_key_order_follows_fields() {
        let key = sample().group_key(&[KeyField::Year, KeyField::Parish]);
        assert_eq!(
            key,
            GroupKey::new([KeyValue::Year(1741), KeyValue::from("St Mary")])
        );
    }

    #[test]
    fn test_prefix() {
        let key = sample().group_key(&[KeyField::Parish, KeyField::Year, KeyField::Category]);
        assert_eq!(key.prefix(1).unwrap().to_string(), "(St Mary)");
        assert!(key.prefix(4).is_none());
    }

    #[test]
    fn test_deserialize_flat_amount() {
        let json = r#"{
            "parish": "St Mary",
            "date": "1741-04-12",
            "category": "Funeral",
            "primary_category": "Poor relief",
            "pounds": 0,
            "shillings": 2,
            "pence": 6
        }"#;
        let parsed: Disbursement = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn test_set_parishes_sorted_unique() {
        let mut other = sample();
        other.parish = "All Saints".to_string();
        let set: DisbursementSet = vec![sample(), other, sample()].into_iter().collect();
        assert_eq!(set.parishes(), vec!["All Saints", "St Mary"]);
        assert_eq!(set.in_category("Funeral").count(), 3);
    }
}
