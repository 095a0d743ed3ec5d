use crate::location::cache::{CacheError, Coverage, LocationCache, MergeOutcome};
use crate::location::entry::{LocationEntry, Position};
use crate::location::matching::{MatchPolicy, SubstringMatch};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by a lookup collaborator.
///
/// None of these abort a resolve: the resolver records the affected names
/// as unresolved and surfaces the error in its report.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("failed to open lookup session: {0}")]
    Connect(String),
    #[error("lookup request failed: {0}")]
    Request(String),
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed lookup export: {0}")]
    Export(#[from] csv::Error),
    #[error("lookup export has no '{0}' column")]
    MissingColumn(String),
}

/// One place returned by the lookup service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupHit {
    pub title: String,
    pub position: Position,
    pub grid_reference: Option<String>,
}

impl From<LookupHit> for LocationEntry {
    fn from(hit: LookupHit) -> Self {
        LocationEntry::resolved(hit.title, hit.position, hit.grid_reference)
    }
}

/// An open connection to a lookup service.
///
/// Whatever the session holds is released when it is dropped.
pub trait LookupSession {
    /// Look up a batch of names in one request.
    ///
    /// May return fewer hits than names, in any order, with titles that
    /// differ from the requested names.
    fn resolve_batch(&mut self, names: &[String]) -> Result<Vec<LookupHit>, LookupError>;
}

/// A service that resolves place names to coordinates.
pub trait LocationLookup {
    type Session: LookupSession;

    fn connect(&mut self) -> Result<Self::Session, LookupError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// Look up names covered only by unresolved placeholders again.
    pub retry_unresolved: bool,
}

/// Outcome of one [`Resolver::resolve`] call.
#[derive(Debug, Default)]
pub struct ResolveReport {
    /// Names already covered by the cache, in sorted order.
    pub already_cached: Vec<String>,
    /// Names sent to the lookup service.
    pub looked_up: Vec<String>,
    /// Looked-up names matched by a returned title.
    pub found: Vec<String>,
    /// Looked-up names recorded as unresolved placeholders.
    pub unresolved: Vec<String>,
    pub merge: MergeOutcome,
    /// Set when the lookup failed; every looked-up name is then unresolved.
    pub lookup_failure: Option<LookupError>,
}

impl ResolveReport {
    pub fn lookup_performed(&self) -> bool {
        !self.looked_up.is_empty()
    }
}

/// Brings a [`LocationCache`] up to date with a batch of place names.
///
/// Only names the cache does not already cover are sent to the lookup
/// service, and all of them go in a single request.
pub struct Resolver<L, P = SubstringMatch> {
    lookup: L,
    policy: P,
    options: ResolveOptions,
}

impl<L: LocationLookup> Resolver<L, SubstringMatch> {
    pub fn new(lookup: L) -> Self {
        Self::with_policy(lookup, SubstringMatch)
    }
}

impl<L: LocationLookup, P: MatchPolicy> Resolver<L, P> {
    pub fn with_policy(lookup: L, policy: P) -> Self {
        Self {
            lookup,
            policy,
            options: ResolveOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Resolve `batch` against `cache`, merge any new entries and persist.
    ///
    /// Every name that needed a lookup ends up covered: either by a returned
    /// title or by an unresolved placeholder titled with the name itself.
    /// Lookup failures are reported in the returned report; only cache
    /// persistence errors are returned as `Err`.
    pub fn resolve<I, S>(
        &mut self,
        cache: &mut LocationCache,
        batch: I,
    ) -> Result<ResolveReport, CacheError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: BTreeSet<String> = batch
            .into_iter()
            .map(|n| n.as_ref().to_string())
            .filter(|n| !n.is_empty())
            .collect();

        let mut report = ResolveReport::default();
        for name in names {
            let covered = match cache.coverage(&name, &self.policy) {
                Coverage::Found(_) => true,
                Coverage::Unresolved(_) => !self.options.retry_unresolved,
                Coverage::Missing => false,
            };
            if covered {
                report.already_cached.push(name);
            } else {
                report.looked_up.push(name);
            }
        }

        info!(
            "Resolving {} names: {} cached, {} to look up",
            report.already_cached.len() + report.looked_up.len(),
            report.already_cached.len(),
            report.looked_up.len()
        );

        if !report.lookup_performed() {
            return Ok(report);
        }

        let hits = match self.run_lookup(&report.looked_up) {
            Ok(hits) => hits,
            Err(e) => {
                warn!(
                    "Location lookup failed, recording {} names as unresolved: {}",
                    report.looked_up.len(),
                    e
                );
                report.lookup_failure = Some(e);
                Vec::new()
            }
        };

        let mut seen_titles = HashSet::new();
        let hits: Vec<LookupHit> = hits
            .into_iter()
            .filter(|h| !h.title.is_empty() && seen_titles.insert(h.title.clone()))
            .collect();

        for name in &report.looked_up {
            if hits.iter().any(|h| self.policy.matches(name, &h.title)) {
                report.found.push(name.clone());
            } else {
                report.unresolved.push(name.clone());
            }
        }
        if report.lookup_failure.is_none() && !report.unresolved.is_empty() {
            warn!(
                "Lookup returned nothing for {} names: {:?}",
                report.unresolved.len(),
                report.unresolved
            );
        }

        let placeholders = report
            .unresolved
            .iter()
            .map(|name| LocationEntry::unresolved(name.clone()));
        let incoming: Vec<LocationEntry> = hits
            .into_iter()
            .map(LocationEntry::from)
            .chain(placeholders)
            .collect();
        report.merge = cache.merge(incoming);
        debug!("Merge outcome: {:?}", report.merge);

        cache.persist()?;
        Ok(report)
    }

    fn run_lookup(&mut self, names: &[String]) -> Result<Vec<LookupHit>, LookupError> {
        let mut session = self.lookup.connect()?;
        let hits = session.resolve_batch(names);
        drop(session);
        let hits = hits?;
        debug!("Lookup returned {} hits for {} names", hits.len(), names.len());
        Ok(hits)
    }
}
