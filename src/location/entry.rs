use serde::{Deserialize, Serialize};
use std::fmt;

/// WGS84 latitude/longitude in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLon {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.latitude, self.longitude)
    }
}

/// Where a place is, if known.
///
/// `NotFound` is a valid terminal state, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Found(LatLon),
    NotFound,
}

impl Position {
    pub fn coordinate(&self) -> Option<LatLon> {
        match self {
            Position::Found(c) => Some(*c),
            Position::NotFound => None,
        }
    }
}

/// How an entry came to be in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Returned by the lookup service (possibly without coordinates).
    Resolved,
    /// Placeholder for a name the lookup service did not return.
    Unresolved,
}

/// A cached location, keyed by its canonical title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationEntry {
    pub title: String,
    pub position: Position,
    /// Raw grid reference or the service's out-of-region marker.
    pub grid_reference: Option<String>,
    pub provenance: Provenance,
}

impl LocationEntry {
    pub fn resolved(
        title: impl Into<String>,
        position: Position,
        grid_reference: Option<String>,
    ) -> Self {
        Self {
            title: title.into(),
            position,
            grid_reference,
            provenance: Provenance::Resolved,
        }
    }

    pub fn unresolved(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            position: Position::NotFound,
            grid_reference: None,
            provenance: Provenance::Unresolved,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.provenance == Provenance::Resolved
    }

    pub fn coordinate(&self) -> Option<LatLon> {
        self.position.coordinate()
    }

    /// True when the entry has coordinates and is not flagged with
    /// `out_of_region_marker`.
    pub fn is_located(&self, out_of_region_marker: &str) -> bool {
        self.coordinate().is_some()
            && self.grid_reference.as_deref() != Some(out_of_region_marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_has_no_coordinate() {
        let entry = LocationEntry::unresolved("Nowhere");
        assert!(!entry.is_resolved());
        assert!(entry.coordinate().is_none());
        assert!(!entry.is_located("Not in UK"));
    }

    #[test]
    fn test_out_of_region_is_not_located() {
        let entry = LocationEntry::resolved(
            "Paris",
            Position::Found(LatLon::new(48.85, 2.35)),
            Some("Not in UK".to_string()),
        );
        assert!(entry.is_resolved());
        assert!(!entry.is_located("Not in UK"));
    }

    #[test]
    fn test_located() {
        let entry = LocationEntry::resolved(
            "Ripon, North Yorkshire",
            Position::Found(LatLon::new(54.138, -1.524)),
            Some("SE3171".to_string()),
        );
        assert!(entry.is_located("Not in UK"));
    }
}
