use serde::{Deserialize, Serialize};

/// Decides whether a requested place name is covered by a cached title.
pub trait MatchPolicy {
    fn matches(&self, name: &str, title: &str) -> bool;
}

/// Case-sensitive substring containment of the name in the title.
///
/// Tolerates titles that qualify the name ("Ripon, North Yorkshire" covers
/// "Ripon"), at the cost of false positives for short names.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatch;

impl MatchPolicy for SubstringMatch {
    fn matches(&self, name: &str, title: &str) -> bool {
        title.contains(name)
    }
}

/// Exact string equality.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatch;

impl MatchPolicy for ExactMatch {
    fn matches(&self, name: &str, title: &str) -> bool {
        name == title
    }
}

/// Configurable choice between the built-in policies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Substring,
    Exact,
}

impl MatchPolicy for MatchMode {
    fn matches(&self, name: &str, title: &str) -> bool {
        match self {
            MatchMode::Substring => SubstringMatch.matches(name, title),
            MatchMode::Exact => ExactMatch.matches(name, title),
        }
    }
}

impl<P: MatchPolicy + ?Sized> MatchPolicy for &P {
    fn matches(&self, name: &str, title: &str) -> bool {
        (**self).matches(name, title)
    }
}
