//! Input selection: which matches feed a computation.
//!
//! Practice exclusion is the caller's policy and is always passed in
//! explicitly. The ranking code never filters on it by itself.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::CalculateError;
use crate::models::{MatchRecord, TournamentId};

/// What to do with matches flagged as practice/exhibition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PracticePolicy {
    /// Competitive matches only
    #[default]
    Exclude,
    /// Everything
    Include,
    /// Practice matches only
    Only,
}

impl PracticePolicy {
    pub fn admits(self, record: &MatchRecord) -> bool {
        match self {
            PracticePolicy::Exclude => !record.is_practice(),
            PracticePolicy::Include => true,
            PracticePolicy::Only => record.is_practice(),
        }
    }
}

impl FromStr for PracticePolicy {
    type Err = CalculateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exclude" => Ok(Self::Exclude),
            "include" => Ok(Self::Include),
            "only" => Ok(Self::Only),
            other => Err(CalculateError::InvalidPracticePolicy(other.to_string())),
        }
    }
}

impl fmt::Display for PracticePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PracticePolicy::Exclude => write!(f, "exclude"),
            PracticePolicy::Include => write!(f, "include"),
            PracticePolicy::Only => write!(f, "only"),
        }
    }
}

/// Caller-supplied input filter.
#[derive(Debug, Clone, Default)]
pub struct MatchFilter {
    pub practice: PracticePolicy,

    /// Restrict to a single tournament
    pub grouping: Option<TournamentId>,
}

impl MatchFilter {
    pub fn new(practice: PracticePolicy) -> Self {
        Self {
            practice,
            grouping: None,
        }
    }

    pub fn for_grouping(mut self, grouping: impl Into<TournamentId>) -> Self {
        self.grouping = Some(grouping.into());
        self
    }

    pub fn admits(&self, record: &MatchRecord) -> bool {
        if let Some(grouping) = &self.grouping {
            if record.grouping_key.as_ref() != Some(grouping) {
                return false;
            }
        }
        self.practice.admits(record)
    }
}

/// A tournament whose matches disagree on the practice flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InconsistentGrouping {
    pub grouping_key: TournamentId,
    pub practice_matches: usize,
    pub competitive_matches: usize,
}

/// Matches admitted by a filter, with consistency warnings.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    pub matches: Vec<&'a MatchRecord>,
    pub warnings: Vec<InconsistentGrouping>,
}

/// Tournaments containing both practice and competitive matches.
///
/// Records without a grouping key are not checked.
pub fn inconsistent_groupings<'a, I>(matches: I) -> Vec<InconsistentGrouping>
where
    I: IntoIterator<Item = &'a MatchRecord>,
{
    let mut flags: BTreeMap<&TournamentId, (usize, usize)> = BTreeMap::new();
    for record in matches {
        if let Some(key) = &record.grouping_key {
            let counts = flags.entry(key).or_default();
            if record.is_practice() {
                counts.0 += 1;
            } else {
                counts.1 += 1;
            }
        }
    }

    flags
        .into_iter()
        .filter(|(_, (practice, competitive))| *practice > 0 && *competitive > 0)
        .map(|(key, (practice_matches, competitive_matches))| InconsistentGrouping {
            grouping_key: key.clone(),
            practice_matches,
            competitive_matches,
        })
        .collect()
}

/// Apply `filter` to `matches`.
///
/// Mixed practice flags inside one tournament are reported and logged, and
/// the filter is still applied per match as given.
pub fn select_matches<'a>(matches: &'a [MatchRecord], filter: &MatchFilter) -> Selection<'a> {
    let in_scope = matches.iter().filter(|m| match &filter.grouping {
        Some(g) => m.grouping_key.as_ref() == Some(g),
        None => true,
    });
    let warnings = inconsistent_groupings(in_scope);
    for w in &warnings {
        warn!(
            grouping = %w.grouping_key,
            practice = w.practice_matches,
            competitive = w.competitive_matches,
            policy = %filter.practice,
            "tournament mixes practice and competitive matches"
        );
    }

    Selection {
        matches: matches.iter().filter(|m| filter.admits(m)).collect(),
        warnings,
    }
}
