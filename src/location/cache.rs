use crate::location::entry::{LatLon, LocationEntry, Position, Provenance};
use crate::location::matching::MatchPolicy;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors arising from loading or persisting the location cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error on location cache {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("location cache {path} is corrupt: {source}")]
    Corrupt { path: PathBuf, source: csv::Error },
    #[error("location cache {path} lists '{title}' more than once")]
    DuplicateTitle { path: PathBuf, title: String },
    #[error("failed to write location cache {path}: {source}")]
    Write { path: PathBuf, source: csv::Error },
}

/// On-disk row layout. Empty cells deserialize to `None`.
#[derive(Debug, Serialize, Deserialize)]
struct CacheRow {
    title: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    grid_reference: Option<String>,
    resolved: bool,
}

impl From<&LocationEntry> for CacheRow {
    fn from(entry: &LocationEntry) -> Self {
        let coordinate = entry.coordinate();
        Self {
            title: entry.title.clone(),
            latitude: coordinate.map(|c| c.latitude),
            longitude: coordinate.map(|c| c.longitude),
            grid_reference: entry.grid_reference.clone(),
            resolved: entry.is_resolved(),
        }
    }
}

impl From<CacheRow> for LocationEntry {
    fn from(row: CacheRow) -> Self {
        let position = match (row.latitude, row.longitude) {
            (Some(lat), Some(lon)) => Position::Found(LatLon::new(lat, lon)),
            _ => Position::NotFound,
        };
        LocationEntry {
            title: row.title,
            position,
            grid_reference: row.grid_reference,
            provenance: if row.resolved {
                Provenance::Resolved
            } else {
                Provenance::Unresolved
            },
        }
    }
}

/// How a requested name relates to the cache.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coverage<'a> {
    /// A resolved entry matches the name.
    Found(&'a LocationEntry),
    /// Only an unresolved placeholder matches the name.
    Unresolved(&'a LocationEntry),
    /// Nothing matches; the name needs a lookup.
    Missing,
}

/// Counts of a [`LocationCache::merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    pub added: usize,
    /// Unresolved placeholders replaced by resolved entries.
    pub upgraded: usize,
    /// Incoming entries ignored because their title was already present.
    pub kept_existing: usize,
}

/// Persisted table of place titles to coordinates.
///
/// Entries are unique by title and always iterate in title order. The cache
/// only grows: merging never removes an entry, and the one replacement it
/// performs is a resolved entry superseding an unresolved placeholder of the
/// same title.
#[derive(Debug, Clone)]
pub struct LocationCache {
    path: PathBuf,
    entries: BTreeMap<String, LocationEntry>,
}

impl LocationCache {
    /// An empty cache that will persist to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Load the cache at `path`.
    ///
    /// A missing file is an empty cache. An unreadable or malformed file is
    /// an error: discarding it would lose earlier lookups.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No location cache at {}, starting empty", path.display());
                return Ok(Self::empty(path));
            }
            Err(source) => return Err(CacheError::Io { path, source }),
        };

        let mut reader = csv::Reader::from_reader(content.as_slice());
        let mut entries = BTreeMap::new();
        for row in reader.deserialize::<CacheRow>() {
            let row = match row {
                Ok(row) => row,
                Err(source) => return Err(CacheError::Corrupt { path, source }),
            };
            if entries.contains_key(&row.title) {
                return Err(CacheError::DuplicateTitle {
                    path,
                    title: row.title,
                });
            }
            entries.insert(row.title.clone(), LocationEntry::from(row));
        }

        debug!("Loaded {} cached locations from {}", entries.len(), path.display());
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in title order.
    pub fn entries(&self) -> impl Iterator<Item = &LocationEntry> {
        self.entries.values()
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn get(&self, title: &str) -> Option<&LocationEntry> {
        self.entries.get(title)
    }

    /// Classify `name` against the cached titles.
    ///
    /// A resolved match wins over an unresolved one.
    pub fn coverage<P: MatchPolicy>(&self, name: &str, policy: &P) -> Coverage<'_> {
        let mut placeholder = None;
        for entry in self.entries.values() {
            if !policy.matches(name, &entry.title) {
                continue;
            }
            if entry.is_resolved() {
                return Coverage::Found(entry);
            }
            placeholder.get_or_insert(entry);
        }
        placeholder.map_or(Coverage::Missing, Coverage::Unresolved)
    }

    /// Merge entries by title.
    pub fn merge(&mut self, incoming: impl IntoIterator<Item = LocationEntry>) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        for entry in incoming {
            match self.entries.get_mut(&entry.title) {
                None => {
                    self.entries.insert(entry.title.clone(), entry);
                    outcome.added += 1;
                }
                Some(existing) if !existing.is_resolved() && entry.is_resolved() => {
                    debug!("Upgrading placeholder for '{}'", entry.title);
                    *existing = entry;
                    outcome.upgraded += 1;
                }
                Some(_) => outcome.kept_existing += 1,
            }
        }
        outcome
    }

    /// Write the whole table to a temporary file beside the cache, then
    /// rename it over the cache file.
    pub fn persist(&self) -> Result<(), CacheError> {
        let io_error = |source| CacheError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(io_error)?;

        let mut temp = NamedTempFile::new_in(&dir).map_err(io_error)?;
        {
            let mut writer = csv::Writer::from_writer(temp.as_file_mut());
            for entry in self.entries.values() {
                writer
                    .serialize(CacheRow::from(entry))
                    .map_err(|source| CacheError::Write {
                        path: self.path.clone(),
                        source,
                    })?;
            }
            writer.flush().map_err(io_error)?;
        }
        temp.as_file().sync_all().map_err(io_error)?;
        temp.persist(&self.path).map_err(|e| io_error(e.error))?;

        debug!("Persisted {} locations to {}", self.entries.len(), self.path.display());
        Ok(())
    }

    /// Entries usable for mapping: with coordinates and inside the region.
    ///
    /// Filtering is a view; the cache itself keeps every entry.
    pub fn located<'a>(
        &'a self,
        out_of_region_marker: &'a str,
    ) -> impl Iterator<Item = &'a LocationEntry> {
        self.entries
            .values()
            .filter(move |e| e.is_located(out_of_region_marker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::matching::{ExactMatch, SubstringMatch};
    use tempfile::tempdir;

    fn found(title: &str, lat: f64, lon: f64) -> LocationEntry {
        LocationEntry::resolved(title, Position::Found(LatLon::new(lat, lon)), Some("SE0000".into()))
    }

    #[test]
    fn test_missing_file_is_empty_cache() {
        let dir = tempdir().unwrap();
        let cache = LocationCache::open(dir.path().join("locations.csv")).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locations.csv");
        fs::write(&path, "title,latitude,longitude,grid_reference,resolved\nRipon,north,1,,true\n")
            .unwrap();
        assert!(matches!(
            LocationCache::open(&path),
            Err(CacheError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_duplicate_title_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locations.csv");
        fs::write(
            &path,
            "title,latitude,longitude,grid_reference,resolved\nRipon,,,,false\nRipon,,,,false\n",
        )
        .unwrap();
        assert!(matches!(
            LocationCache::open(&path),
            Err(CacheError::DuplicateTitle { .. })
        ));
    }

    #[test]
    fn test_persist_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("locations.csv");
        let mut cache = LocationCache::empty(&path);
        cache.merge(vec![
            found("Ripon", 54.138, -1.524),
            LocationEntry::unresolved("Atlantis"),
            LocationEntry::resolved("Paris", Position::NotFound, Some("Not in UK".into())),
        ]);
        cache.persist().unwrap();

        let reloaded = LocationCache::open(&path).unwrap();
        assert_eq!(reloaded.len(), 3);
        assert_eq!(reloaded.titles().collect::<Vec<_>>(), vec!["Atlantis", "Paris", "Ripon"]);
        assert_eq!(reloaded.get("Ripon"), cache.get("Ripon"));
        assert_eq!(reloaded.get("Atlantis"), Some(&LocationEntry::unresolved("Atlantis")));
        assert_eq!(reloaded.get("Paris").unwrap().grid_reference.as_deref(), Some("Not in UK"));
    }

    #[test]
    fn test_persist_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locations.csv");
        let mut cache = LocationCache::empty(&path);
        cache.merge(vec![found("Ripon", 54.1, -1.5)]);
        cache.persist().unwrap();
        cache.persist().unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("locations.csv")]);
    }

    #[test]
    fn test_merge_keeps_existing_and_upgrades_placeholders() {
        let mut cache = LocationCache::empty("unused.csv");
        cache.merge(vec![found("Ripon", 54.1, -1.5), LocationEntry::unresolved("Ely")]);

        let outcome = cache.merge(vec![
            found("Ripon", 0.0, 0.0),
            found("Ely", 52.4, 0.26),
            LocationEntry::unresolved("York"),
        ]);
        assert_eq!(
            outcome,
            MergeOutcome {
                added: 1,
                upgraded: 1,
                kept_existing: 1
            }
        );
        assert_eq!(cache.get("Ripon").unwrap().coordinate(), Some(LatLon::new(54.1, -1.5)));
        assert!(cache.get("Ely").unwrap().is_resolved());
    }

    #[test]
    fn test_unresolved_never_replaces_resolved() {
        let mut cache = LocationCache::empty("unused.csv");
        cache.merge(vec![found("Ripon", 54.1, -1.5)]);
        cache.merge(vec![LocationEntry::unresolved("Ripon")]);
        assert!(cache.get("Ripon").unwrap().is_resolved());
    }

    #[test]
    fn test_coverage() {
        let mut cache = LocationCache::empty("unused.csv");
        cache.merge(vec![
            found("Ripon, North Yorkshire", 54.1, -1.5),
            LocationEntry::unresolved("Ely"),
        ]);

        assert!(matches!(cache.coverage("Ripon", &SubstringMatch), Coverage::Found(_)));
        assert!(matches!(cache.coverage("Ripon", &ExactMatch), Coverage::Missing));
        assert!(matches!(cache.coverage("Ely", &SubstringMatch), Coverage::Unresolved(_)));
        assert!(matches!(cache.coverage("Selby", &SubstringMatch), Coverage::Missing));
        // "York" is contained in "North Yorkshire"
        assert!(matches!(cache.coverage("York", &SubstringMatch), Coverage::Found(_)));
        assert!(matches!(cache.coverage("York", &ExactMatch), Coverage::Missing));
    }

    #[test]
    fn test_located_filters_without_mutating() {
        let mut cache = LocationCache::empty("unused.csv");
        cache.merge(vec![
            found("Ripon", 54.1, -1.5),
            LocationEntry::resolved("Paris", Position::Found(LatLon::new(48.8, 2.3)), Some("Not in UK".into())),
            LocationEntry::resolved("Lost", Position::NotFound, None),
            LocationEntry::unresolved("Ely"),
        ]);
        let located: Vec<_> = cache.located("Not in UK").map(|e| e.title.as_str()).collect();
        assert_eq!(located, vec!["Ripon"]);
        assert_eq!(cache.len(), 4);
    }
}
