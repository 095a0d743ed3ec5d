//! Reading grid reference finder CSV exports.
//!
//! The export is a quoted CSV table with at least `Title`,
//! `Grid Reference`, `Latitude` and `Longitude` columns. Places the service
//! could not find either carry its out-of-region marker as the grid
//! reference or have empty coordinates.

use crate::location::entry::{LatLon, Position};
use crate::location::matching::{MatchMode, MatchPolicy};
use crate::location::resolver::{LocationLookup, LookupError, LookupHit, LookupSession};
use log::debug;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;

const TITLE: &str = "Title";
const GRID_REFERENCE: &str = "Grid Reference";
const LATITUDE: &str = "Latitude";
const LONGITUDE: &str = "Longitude";

/// Parse an export into lookup hits, in file order.
pub fn parse_export<R: Read>(source: R) -> Result<Vec<LookupHit>, LookupError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| LookupError::MissingColumn(name.to_string()))
    };
    let title_col = column(TITLE)?;
    let grid_col = column(GRID_REFERENCE)?;
    let lat_col = column(LATITUDE)?;
    let lon_col = column(LONGITUDE)?;

    let mut hits = Vec::new();
    for record in reader.records() {
        let record = record?;
        let title = record.get(title_col).unwrap_or_default();
        if title.is_empty() {
            continue;
        }

        let coordinate = |col: usize| {
            record
                .get(col)
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|c| c.is_finite())
        };
        let position = match (coordinate(lat_col), coordinate(lon_col)) {
            (Some(lat), Some(lon)) => Position::Found(LatLon::new(lat, lon)),
            _ => Position::NotFound,
        };
        let grid_reference = record
            .get(grid_col)
            .filter(|g| !g.is_empty())
            .map(str::to_string);

        hits.push(LookupHit {
            title: title.to_string(),
            position,
            grid_reference,
        });
    }
    Ok(hits)
}

/// Lookup backed by a saved export file.
///
/// A session holds the open file; hits are the exported rows whose title
/// matches one of the requested names.
#[derive(Debug, Clone)]
pub struct ExportFileLookup {
    path: PathBuf,
    policy: MatchMode,
}

impl ExportFileLookup {
    pub fn new(path: impl Into<PathBuf>, policy: MatchMode) -> Self {
        Self {
            path: path.into(),
            policy,
        }
    }
}

pub struct ExportSession {
    reader: BufReader<File>,
    policy: MatchMode,
}

impl LocationLookup for ExportFileLookup {
    type Session = ExportSession;

    fn connect(&mut self) -> Result<ExportSession, LookupError> {
        let file = File::open(&self.path).map_err(|source| LookupError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!("Opened lookup export {}", self.path.display());
        Ok(ExportSession {
            reader: BufReader::new(file),
            policy: self.policy,
        })
    }
}

impl LookupSession for ExportSession {
    fn resolve_batch(&mut self, names: &[String]) -> Result<Vec<LookupHit>, LookupError> {
        let hits = parse_export(&mut self.reader)?;
        Ok(hits
            .into_iter()
            .filter(|hit| names.iter().any(|n| self.policy.matches(n, &hit.title)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const EXPORT: &str = "\"Title\",\"Grid Reference\",\"Easting\",\"Northing\",\"Latitude\",\"Longitude\"
\"Ripon, North Yorkshire\",\"SE3171\",\"431500\",\"471500\",\"54.138\",\"-1.524\"
\"Paris\",\"Not in UK\",\"\",\"\",\"48.8566\",\"2.3522\"
\"Nowhere\",\"\",\"\",\"\",\"\",\"\"
";

    #[test]
    fn test_parse_export() {
        let hits = parse_export(EXPORT.as_bytes()).unwrap();
        assert_eq!(hits.len(), 3);

        assert_eq!(hits[0].title, "Ripon, North Yorkshire");
        assert_eq!(hits[0].grid_reference.as_deref(), Some("SE3171"));
        let ripon = hits[0].position.coordinate().unwrap();
        assert_relative_eq!(ripon.latitude, 54.138);
        assert_relative_eq!(ripon.longitude, -1.524);

        assert_eq!(hits[1].grid_reference.as_deref(), Some("Not in UK"));
        assert_eq!(hits[2].position, Position::NotFound);
        assert_eq!(hits[2].grid_reference, None);
    }

    #[test]
    fn test_non_finite_coordinates_not_found() {
        let export = "\"Title\",\"Grid Reference\",\"Latitude\",\"Longitude\"
\"Ripon\",\"SE3171\",\"NaN\",\"-1.524\"
\"Otley\",\"SE2045\",\"53.905\",\"inf\"
";
        let hits = parse_export(export.as_bytes()).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.position == Position::NotFound));
    }

    #[test]
    fn test_missing_column() {
        let err = parse_export("\"Title\",\"Latitude\"\n\"Ripon\",\"54\"\n".as_bytes()).unwrap_err();
        assert!(matches!(err, LookupError::MissingColumn(c) if c == "Grid Reference"));
    }

    #[test]
    fn test_export_file_lookup_filters_requested() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(EXPORT.as_bytes()).unwrap();

        let mut lookup = ExportFileLookup::new(file.path(), MatchMode::Substring);
        let mut session = lookup.connect().unwrap();
        let hits = session
            .resolve_batch(&["Ripon".to_string(), "York".to_string()])
            .unwrap();

        let titles: Vec<_> = hits.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["Ripon, North Yorkshire"]);
    }

    #[test]
    fn test_export_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut lookup = ExportFileLookup::new(dir.path().join("none.csv"), MatchMode::Exact);
        assert!(matches!(lookup.connect(), Err(LookupError::Io { .. })));
    }
}
