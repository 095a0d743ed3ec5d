use crate::location::cache::LocationCache;
use crate::location::entry::LatLon;
use crate::location::matching::MatchPolicy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Home parishes of the two parties to a marriage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarriageRecord {
    pub groom_parish: String,
    pub bride_parish: String,
}

impl MarriageRecord {
    /// Build a record, trimming stray whitespace around both names.
    pub fn new(groom_parish: &str, bride_parish: &str) -> Self {
        Self {
            groom_parish: groom_parish.trim().to_string(),
            bride_parish: bride_parish.trim().to_string(),
        }
    }

    pub fn tidy(&self) -> Self {
        Self::new(&self.groom_parish, &self.bride_parish)
    }
}

/// A link between two located parishes with the number of marriages joining them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkEdge {
    pub groom_parish: String,
    pub bride_parish: String,
    pub groom_location: LatLon,
    pub bride_location: LatLon,
    pub count: usize,
}

/// A register of marriages, with blank entries dropped and names trimmed.
#[derive(Debug, Clone, Default)]
pub struct MarriageRegister {
    records: Vec<MarriageRecord>,
}

impl MarriageRegister {
    pub fn new(records: impl IntoIterator<Item = MarriageRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|r| r.tidy())
                .filter(|r| !r.groom_parish.is_empty() && !r.bride_parish.is_empty())
                .collect(),
        }
    }

    pub fn records(&self) -> &[MarriageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every distinct (groom parish, bride parish) pair with its count.
    pub fn pair_counts(&self) -> BTreeMap<(String, String), usize> {
        let mut counts = BTreeMap::new();
        for r in &self.records {
            *counts
                .entry((r.groom_parish.clone(), r.bride_parish.clone()))
                .or_insert(0) += 1;
        }
        counts
    }

    /// Distinct parishes named on either side; the batch to resolve.
    pub fn parishes(&self) -> BTreeSet<String> {
        self.records
            .iter()
            .flat_map(|r| [r.groom_parish.clone(), r.bride_parish.clone()])
            .collect()
    }

    /// Pairs whose parishes both have a usable location in `cache`.
    pub fn network_edges<P: MatchPolicy>(
        &self,
        cache: &LocationCache,
        policy: &P,
        out_of_region_marker: &str,
    ) -> Vec<NetworkEdge> {
        let locate = |parish: &str| {
            cache
                .located(out_of_region_marker)
                .find(|e| policy.matches(parish, &e.title))
                .and_then(|e| e.coordinate())
        };

        self.pair_counts()
            .into_iter()
            .filter_map(|((groom, bride), count)| {
                let groom_location = locate(&groom)?;
                let bride_location = locate(&bride)?;
                Some(NetworkEdge {
                    groom_parish: groom,
                    bride_parish: bride,
                    groom_location,
                    bride_location,
                    count,
                })
            })
            .collect()
    }
}
